//! TOML config file loading and validation for targets, control tuning, and
//! output wiring.

use anyhow::{bail, Context, Result};
use greenhouse_core::{ClimateConfig, LightConfig, Targets};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub targets: TargetsEntry,
    pub climate: ClimateEntry,
    pub light: LightEntry,
    pub outputs: OutputsEntry,
    pub control: ControlEntry,
    pub sim: SimEntry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetsEntry {
    pub temp_c: f32,
    pub humidity_pct: f32,
    pub light_hours: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimateEntry {
    pub temp_hysteresis_c: f32,
    pub humidity_hysteresis_pct: f32,
    pub mister_max_on_ms: u32,
    pub mister_min_off_ms: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightEntry {
    pub dark_threshold: u16,
    pub sample_interval_ms: u32,
    pub day_length_ms: u32,
    /// ADS1115 input the LDR divider is wired to (only with the `adc` feature).
    pub adc_channel: usize,
    pub adc_address: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputsEntry {
    pub lamp_gpio: i64,
    pub heater_gpio: i64,
    pub mister_gpio: i64,
    /// Many common relay boards are active-low.
    pub active_low: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlEntry {
    pub cycle_ms: u64,
    pub report_every_s: u64,
    pub reload_every_s: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimEntry {
    pub scenario: String,
}

impl Default for TargetsEntry {
    fn default() -> Self {
        let t = Targets::default();
        Self {
            temp_c: t.temp_c,
            humidity_pct: t.humidity_pct,
            light_hours: t.light_hours,
        }
    }
}

impl Default for ClimateEntry {
    fn default() -> Self {
        let c = ClimateConfig::default();
        Self {
            temp_hysteresis_c: c.temp_hysteresis_c,
            humidity_hysteresis_pct: c.humidity_hysteresis_pct,
            mister_max_on_ms: c.mister_max_on_ms,
            mister_min_off_ms: c.mister_min_off_ms,
        }
    }
}

impl Default for LightEntry {
    fn default() -> Self {
        let l = LightConfig::default();
        Self {
            dark_threshold: l.dark_threshold,
            sample_interval_ms: l.sample_interval_ms,
            day_length_ms: l.day_length_ms,
            adc_channel: 0,
            adc_address: 0x48,
        }
    }
}

impl Default for OutputsEntry {
    fn default() -> Self {
        Self {
            lamp_gpio: 17,
            heater_gpio: 27,
            mister_gpio: 22,
            active_low: true,
        }
    }
}

impl Default for ControlEntry {
    fn default() -> Self {
        Self {
            cycle_ms: 250,
            report_every_s: 60,
            reload_every_s: 5,
        }
    }
}

impl Default for SimEntry {
    fn default() -> Self {
        Self {
            scenario: "steady".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions into core types
// ---------------------------------------------------------------------------

impl Config {
    pub fn targets(&self) -> Targets {
        Targets {
            temp_c: self.targets.temp_c,
            humidity_pct: self.targets.humidity_pct,
            light_hours: self.targets.light_hours,
        }
    }

    pub fn climate(&self) -> ClimateConfig {
        ClimateConfig {
            temp_hysteresis_c: self.climate.temp_hysteresis_c,
            humidity_hysteresis_pct: self.climate.humidity_hysteresis_pct,
            mister_max_on_ms: self.climate.mister_max_on_ms,
            mister_min_off_ms: self.climate.mister_min_off_ms,
        }
    }

    pub fn light(&self) -> LightConfig {
        LightConfig {
            dark_threshold: self.light.dark_threshold,
            sample_interval_ms: self.light.sample_interval_ms,
            day_length_ms: self.light.day_length_ms,
        }
    }

    /// Output name → BCM pin, in a fixed order.
    pub fn output_pins(&self) -> [(&'static str, u8); 3] {
        [
            ("lamp", self.outputs.lamp_gpio as u8),
            ("heater", self.outputs.heater_gpio as u8),
            ("mister", self.outputs.mister_gpio as u8),
        ]
    }
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
/// GPIO 28+ are not exposed on the standard header.
const VALID_GPIO_PINS: &[i64] = &[
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27,
];

/// Highest single-ended ADS1115 input.
const MAX_ADC_CHANNEL: usize = 3;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all config entries. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        validate_targets(&self.targets, &mut errors);
        self.validate_climate(&mut errors);
        self.validate_light(&mut errors);
        self.validate_outputs(&mut errors);
        self.validate_control(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_climate(&self, errors: &mut Vec<String>) {
        let c = &self.climate;
        if c.temp_hysteresis_c.is_nan() || c.temp_hysteresis_c <= 0.0 {
            errors.push(format!(
                "climate: temp_hysteresis_c must be positive, got {}",
                c.temp_hysteresis_c
            ));
        }
        if c.humidity_hysteresis_pct.is_nan() || c.humidity_hysteresis_pct <= 0.0 {
            errors.push(format!(
                "climate: humidity_hysteresis_pct must be positive, got {}",
                c.humidity_hysteresis_pct
            ));
        }
        if c.mister_max_on_ms == 0 {
            errors.push("climate: mister_max_on_ms must be positive".to_string());
        }
        if c.mister_min_off_ms == 0 {
            errors.push("climate: mister_min_off_ms must be positive".to_string());
        }
    }

    fn validate_light(&self, errors: &mut Vec<String>) {
        let l = &self.light;
        if l.sample_interval_ms == 0 {
            errors.push("light: sample_interval_ms must be positive".to_string());
        }
        if l.day_length_ms == 0 {
            errors.push("light: day_length_ms must be positive".to_string());
        } else if l.day_length_ms < l.sample_interval_ms {
            errors.push(format!(
                "light: day_length_ms ({}) is shorter than sample_interval_ms ({})",
                l.day_length_ms, l.sample_interval_ms
            ));
        }
        if l.adc_channel > MAX_ADC_CHANNEL {
            errors.push(format!(
                "light: adc_channel {} out of range (0-{MAX_ADC_CHANNEL})",
                l.adc_channel
            ));
        }
    }

    fn validate_outputs(&self, errors: &mut Vec<String>) {
        let mut seen_pins: HashSet<i64> = HashSet::new();

        for (name, pin) in [
            ("lamp_gpio", self.outputs.lamp_gpio),
            ("heater_gpio", self.outputs.heater_gpio),
            ("mister_gpio", self.outputs.mister_gpio),
        ] {
            if !VALID_GPIO_PINS.contains(&pin) {
                errors.push(format!(
                    "outputs: {name} {pin} is not a valid BCM GPIO pin (allowed: 2-27)"
                ));
            } else if !seen_pins.insert(pin) {
                errors.push(format!(
                    "outputs: {name} {pin} is already used by another output"
                ));
            }
        }
    }

    fn validate_control(&self, errors: &mut Vec<String>) {
        let c = &self.control;
        if c.cycle_ms == 0 {
            errors.push("control: cycle_ms must be positive".to_string());
        }
        if c.report_every_s == 0 {
            errors.push("control: report_every_s must be positive".to_string());
        }
        if c.reload_every_s == 0 {
            errors.push("control: reload_every_s must be positive".to_string());
        }
    }
}

fn validate_targets(t: &TargetsEntry, errors: &mut Vec<String>) {
    if !t.temp_c.is_finite() {
        errors.push(format!("targets: temp_c must be a number, got {}", t.temp_c));
    }
    if !(0.0..=100.0).contains(&t.humidity_pct) {
        errors.push(format!(
            "targets: humidity_pct {} out of range [0, 100]",
            t.humidity_pct
        ));
    }
    if !(0.0..=24.0).contains(&t.light_hours) {
        errors.push(format!(
            "targets: light_hours {} out of range [0, 24]",
            t.light_hours
        ));
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Parse and validate config text.
pub fn parse(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).context("failed to parse config")?;
    config.validate()?;
    Ok(config)
}

/// Read, parse, and validate a TOML config file.  A missing file yields
/// the built-in defaults.
pub fn load(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        tracing::warn!(path, "config file not found, using defaults");
        return Ok(Config::default());
    }
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    parse(&contents).with_context(|| format!("invalid config: {path}"))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn err_text(cfg: &Config) -> String {
        format!("{:#}", cfg.validate().unwrap_err())
    }

    // -- Defaults -----------------------------------------------------------

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.targets(), Targets::default());
        assert_eq!(cfg.climate(), ClimateConfig::default());
        assert_eq!(cfg.light(), LightConfig::default());
        assert_eq!(cfg.control.cycle_ms, 250);
        assert!(cfg.outputs.active_low);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = parse(
            r#"
            [targets]
            temp_c = 24.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.targets.temp_c, 24.0);
        assert_eq!(cfg.targets.humidity_pct, 65.0);
        assert_eq!(cfg.targets.light_hours, 6.0);
    }

    #[test]
    fn full_file_parses() {
        let cfg = parse(
            r#"
            [targets]
            temp_c = 22.0
            humidity_pct = 70.0
            light_hours = 10.0

            [climate]
            temp_hysteresis_c = 1.0
            humidity_hysteresis_pct = 5.0
            mister_max_on_ms = 15000
            mister_min_off_ms = 30000

            [light]
            dark_threshold = 800
            sample_interval_ms = 2000
            day_length_ms = 3600000
            adc_channel = 2

            [outputs]
            lamp_gpio = 5
            heater_gpio = 6
            mister_gpio = 13
            active_low = false

            [control]
            cycle_ms = 100
            report_every_s = 10
            reload_every_s = 2

            [sim]
            scenario = "cold"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.climate().mister_min_off_ms, 30_000);
        assert_eq!(cfg.light().day_length_ms, 3_600_000);
        assert_eq!(cfg.light.adc_channel, 2);
        assert_eq!(cfg.output_pins(), [("lamp", 5), ("heater", 6), ("mister", 13)]);
        assert!(!cfg.outputs.active_low);
        assert_eq!(cfg.sim.scenario, "cold");
    }

    #[test]
    fn unparseable_toml_is_error() {
        assert!(parse("[targets\ntemp_c = ").is_err());
    }

    // -- Targets ------------------------------------------------------------

    #[test]
    fn light_hours_out_of_range() {
        let mut cfg = Config::default();
        cfg.targets.light_hours = 25.0;
        assert!(err_text(&cfg).contains("light_hours 25 out of range"));
    }

    #[test]
    fn zero_light_hours_is_allowed() {
        let mut cfg = Config::default();
        cfg.targets.light_hours = 0.0;
        cfg.validate().unwrap();
    }

    #[test]
    fn humidity_out_of_range() {
        let mut cfg = Config::default();
        cfg.targets.humidity_pct = -1.0;
        assert!(err_text(&cfg).contains("humidity_pct -1 out of range"));
    }

    #[test]
    fn nan_temp_target_rejected() {
        let mut cfg = Config::default();
        cfg.targets.temp_c = f32::NAN;
        assert!(err_text(&cfg).contains("temp_c must be a number"));
    }

    // -- Climate / light ----------------------------------------------------

    #[test]
    fn zero_hysteresis_rejected() {
        let mut cfg = Config::default();
        cfg.climate.temp_hysteresis_c = 0.0;
        assert!(err_text(&cfg).contains("temp_hysteresis_c must be positive"));
    }

    #[test]
    fn zero_mister_timers_rejected() {
        let mut cfg = Config::default();
        cfg.climate.mister_max_on_ms = 0;
        cfg.climate.mister_min_off_ms = 0;
        let msg = err_text(&cfg);
        assert!(msg.contains("mister_max_on_ms must be positive"));
        assert!(msg.contains("mister_min_off_ms must be positive"));
    }

    #[test]
    fn day_shorter_than_sample_rejected() {
        let mut cfg = Config::default();
        cfg.light.day_length_ms = 500;
        assert!(err_text(&cfg).contains("shorter than sample_interval_ms"));
    }

    #[test]
    fn adc_channel_out_of_range() {
        let mut cfg = Config::default();
        cfg.light.adc_channel = 4;
        assert!(err_text(&cfg).contains("adc_channel 4 out of range"));
    }

    // -- Outputs ------------------------------------------------------------

    #[test]
    fn reserved_gpio_rejected() {
        let mut cfg = Config::default();
        cfg.outputs.lamp_gpio = 0;
        assert!(err_text(&cfg).contains("lamp_gpio 0 is not a valid BCM GPIO pin"));
    }

    #[test]
    fn gpio_above_header_rejected() {
        let mut cfg = Config::default();
        cfg.outputs.heater_gpio = 28;
        assert!(err_text(&cfg).contains("heater_gpio 28 is not a valid"));
    }

    #[test]
    fn duplicate_gpio_rejected() {
        let mut cfg = Config::default();
        cfg.outputs.mister_gpio = cfg.outputs.lamp_gpio;
        assert!(err_text(&cfg).contains("mister_gpio 17 is already used"));
    }

    // -- Control ------------------------------------------------------------

    #[test]
    fn zero_cycle_rejected() {
        let mut cfg = Config::default();
        cfg.control.cycle_ms = 0;
        assert!(err_text(&cfg).contains("cycle_ms must be positive"));
    }

    // -- Error aggregation --------------------------------------------------

    #[test]
    fn reports_every_violation() {
        let mut cfg = Config::default();
        cfg.targets.light_hours = 30.0;
        cfg.climate.humidity_hysteresis_pct = -1.0;
        cfg.outputs.lamp_gpio = 1;
        let msg = err_text(&cfg);
        assert!(msg.contains("3 errors"), "{msg}");
    }

    #[test]
    fn single_violation_is_singular() {
        let mut cfg = Config::default();
        cfg.control.reload_every_s = 0;
        assert!(err_text(&cfg).contains("(1 error)"));
    }

    // -- load ---------------------------------------------------------------

    #[test]
    fn load_missing_file_uses_defaults() {
        let cfg = load("/nonexistent/greenhouse.toml").unwrap();
        assert_eq!(cfg.targets(), Targets::default());
    }

    #[test]
    fn load_invalid_file_names_path() {
        let path = std::env::temp_dir().join(format!("gh-cfg-{}.toml", std::process::id()));
        std::fs::write(&path, "[targets]\nlight_hours = 99.0\n").unwrap();
        let p = path.to_str().unwrap();
        let msg = format!("{:#}", load(p).unwrap_err());
        std::fs::remove_file(&path).ok();
        assert!(msg.contains("invalid config"), "{msg}");
        assert!(msg.contains("light_hours 99 out of range"), "{msg}");
    }
}
