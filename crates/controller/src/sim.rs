//! Stateful greenhouse simulator for local development.
//!
//! Models enough physics to exercise the controller end to end:
//! - Temperature relaxes toward a diurnal outdoor temperature; the heater
//!   pushes it up
//! - Humidity evaporates away; the mister pushes it up
//! - Ambient light follows a day/night curve with passing clouds
//! - Per-reading sensor noise and occasional failed climate reads
//!
//! The climate and light halves are separate values so a control cycle can
//! borrow both sensors at once.

use std::f64::consts::PI;
use std::fmt;

use greenhouse_core::{elapsed, AmbientLightSensor, ClimateSensor, Millis, SensorSnapshot};

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Approximate a sample from N(0,1) using the Irwin-Hall method:
/// sum of 12 uniform [0,1) values minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

/// Sample from N(mean, sigma).
fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

/// Position in the day/night cycle: 0 at "sunrise", positive during the day.
fn diurnal(now: Millis, day_length_ms: Millis) -> f64 {
    if day_length_ms == 0 {
        return 0.0;
    }
    let phase = f64::from(now % day_length_ms) / f64::from(day_length_ms);
    (2.0 * PI * phase).sin()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Pre-configured simulation profiles selectable via `SIM_SCENARIO` env var
/// or `[sim] scenario` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Mild outdoor climate, reliable sensor.  Heater and mister rarely run.
    Steady,
    /// Cold nights.  Heater cycles through its hysteresis band.
    Cold,
    /// Fast evaporation.  Mister bursts regularly hit the max-on ceiling.
    Dry,
    /// Noisy readings and ~15% failed climate reads.  Exercises fail-safe.
    Flaky,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "cold" => Self::Cold,
            "dry" => Self::Dry,
            "flaky" => Self::Flaky,
            _ => Self::Steady, // default
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steady => write!(f, "steady"),
            Self::Cold => write!(f, "cold"),
            Self::Dry => write!(f, "dry"),
            Self::Flaky => write!(f, "flaky"),
        }
    }
}

/// Physical constants for one scenario.
#[derive(Debug, Clone, Copy)]
struct Profile {
    outdoor_mean_c: f64,
    outdoor_swing_c: f64,
    /// Fraction of the indoor/outdoor difference lost per second.
    heat_loss_per_s: f64,
    heater_c_per_s: f64,
    evaporation_pct_per_s: f64,
    mister_pct_per_s: f64,
    temp_noise_c: f64,
    humidity_noise_pct: f64,
    read_fail_prob: f32,
}

impl Profile {
    fn for_scenario(scenario: Scenario) -> Self {
        let steady = Self {
            outdoor_mean_c: 25.0,
            outdoor_swing_c: 3.0,
            heat_loss_per_s: 0.002,
            heater_c_per_s: 0.02,
            evaporation_pct_per_s: 0.01,
            mister_pct_per_s: 0.3,
            temp_noise_c: 0.05,
            humidity_noise_pct: 0.3,
            read_fail_prob: 0.005,
        };
        match scenario {
            Scenario::Steady => steady,
            Scenario::Cold => Self {
                outdoor_mean_c: 12.0,
                outdoor_swing_c: 5.0,
                ..steady
            },
            Scenario::Dry => Self {
                evaporation_pct_per_s: 0.12,
                mister_pct_per_s: 0.15,
                ..steady
            },
            Scenario::Flaky => Self {
                temp_noise_c: 0.4,
                humidity_noise_pct: 2.0,
                read_fail_prob: 0.15,
                ..steady
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Climate half
// ---------------------------------------------------------------------------

/// Simulated air inside the greenhouse plus the temperature/humidity probe.
pub struct ClimateModel {
    profile: Profile,
    day_length_ms: Millis,
    temp_c: f64,
    humidity_pct: f64,
}

impl ClimateModel {
    /// Evolve the air by `dt_ms` at time `now` given the current actuators.
    fn step(&mut self, now: Millis, dt_ms: Millis, heater_on: bool, mister_on: bool) {
        let p = &self.profile;
        let dt = f64::from(dt_ms) / 1000.0;

        let outdoor = p.outdoor_mean_c + p.outdoor_swing_c * diurnal(now, self.day_length_ms);
        let loss = p.heat_loss_per_s * (outdoor - self.temp_c);
        let heat = if heater_on { p.heater_c_per_s } else { 0.0 };
        self.temp_c += (loss + heat) * dt;

        let mist = if mister_on { p.mister_pct_per_s } else { 0.0 };
        self.humidity_pct =
            (self.humidity_pct + (mist - p.evaporation_pct_per_s) * dt).clamp(5.0, 100.0);
    }

    pub fn true_temp_c(&self) -> f64 {
        self.temp_c
    }

    pub fn true_humidity_pct(&self) -> f64 {
        self.humidity_pct
    }
}

impl ClimateSensor for ClimateModel {
    fn read(&mut self) -> SensorSnapshot {
        if fastrand::f32() < self.profile.read_fail_prob {
            return SensorSnapshot::invalid();
        }
        let t = gaussian(self.temp_c, self.profile.temp_noise_c);
        let h = gaussian(self.humidity_pct, self.profile.humidity_noise_pct).clamp(0.0, 100.0);
        SensorSnapshot::valid(t as f32, h as f32)
    }
}

// ---------------------------------------------------------------------------
// Light half
// ---------------------------------------------------------------------------

/// Simulated LDR divider on a 10-bit ADC (0 = dark, 1023 = full sun).
pub struct LightModel {
    day_length_ms: Millis,
    now_ms: Millis,
    /// Multiplier for passing clouds, 0.3..=1.0.
    cloud: f64,
    reads: u64,
}

const NIGHT_RAW: f64 = 40.0;
const FULL_SUN_RAW: f64 = 1023.0;

impl LightModel {
    fn set_time(&mut self, now: Millis) {
        self.now_ms = now;
        // Clouds drift slowly.
        self.cloud = (self.cloud + gaussian(0.0, 0.01)).clamp(0.3, 1.0);
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl AmbientLightSensor for LightModel {
    fn read_raw(&mut self) -> u16 {
        self.reads += 1;
        let sun = diurnal(self.now_ms, self.day_length_ms).max(0.0);
        let raw = NIGHT_RAW + (FULL_SUN_RAW - NIGHT_RAW) * sun * self.cloud + gaussian(0.0, 5.0);
        raw.round().clamp(0.0, FULL_SUN_RAW) as u16
    }
}

// ---------------------------------------------------------------------------
// Main simulator
// ---------------------------------------------------------------------------

pub struct GreenhouseSim {
    pub climate: ClimateModel,
    pub light: LightModel,
    last_ms: Millis,
}

impl GreenhouseSim {
    /// `day_length_ms` should match the light scheduler's day so the
    /// simulated sun and the accounting day line up.
    pub fn new(scenario: Scenario, now: Millis, day_length_ms: Millis) -> Self {
        let profile = Profile::for_scenario(scenario);
        Self {
            climate: ClimateModel {
                profile,
                day_length_ms,
                temp_c: gaussian(profile.outdoor_mean_c, 1.0),
                humidity_pct: gaussian(60.0, 3.0).clamp(5.0, 100.0),
            },
            light: LightModel {
                day_length_ms,
                now_ms: now,
                cloud: 1.0,
                reads: 0,
            },
            last_ms: now,
        }
    }

    /// Advance the world to `now` with the actuator states commanded in the
    /// previous cycle.
    pub fn advance(&mut self, now: Millis, heater_on: bool, mister_on: bool) {
        let dt = elapsed(now, self.last_ms);
        self.last_ms = now;
        self.climate.step(now, dt, heater_on, mister_on);
        self.light.set_time(now);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
