//! Daily light-budget scheduler.
//!
//! Each day the plants should receive `target_hours` of *effective light*:
//! ambient brightness, or the supplemental lamp.  The lamp is paced rather
//! than deadline-driven: at any point in the day the scheduler aims to be at
//! least as far along as the linear pro-rata share of the target.
//!
//! ```text
//! expected_so_far = target_hours * elapsed_in_day / day_length
//! lamp_on         = dark && hours_today + EPS < expected_so_far
//!                        && target_hours > 0 && hours_today < target_hours
//! ```
//!
//! The ambient sensor is sampled at most once per `sample_interval_ms`.
//! Light hours are only credited on a fresh sample.

use tracing::{debug, info};

use crate::clock::{elapsed, Millis};
use crate::io::{Actuator, AmbientLightSensor};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Tie-break tolerance in hours.  Keeps the lamp from toggling when the
/// accumulator sits exactly on the pro-rata line.
const SCHEDULE_EPSILON_HRS: f64 = 0.001;

const MAX_HOURS_PER_DAY: f64 = 24.0;

// ---------------------------------------------------------------------------
// Configuration / output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    /// Raw readings below this are dark.
    pub dark_threshold: u16,
    pub sample_interval_ms: Millis,
    pub day_length_ms: Millis,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 950,
            sample_interval_ms: 1_000,
            day_length_ms: 24 * 60 * 60 * 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightOutput {
    pub lamp_on: bool,
    pub hours_today: f32,
    pub day_start_ms: Millis,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LightScheduler {
    cfg: LightConfig,
    last_sample_ms: Millis,
    day_start_ms: Millis,
    hours_today: f64,
    lamp_on: bool,
}

impl LightScheduler {
    /// Turn the lamp off and start a fresh day at `now`.
    pub fn initialize(now: Millis, cfg: LightConfig, lamp: &mut dyn Actuator) -> Self {
        lamp.set_on(false);
        info!(
            dark_threshold = cfg.dark_threshold,
            sample_interval_ms = cfg.sample_interval_ms,
            day_length_ms = cfg.day_length_ms,
            "light scheduler initialised"
        );
        Self {
            cfg,
            last_sample_ms: now,
            day_start_ms: now,
            hours_today: 0.0,
            lamp_on: false,
        }
    }

    pub fn output(&self) -> LightOutput {
        LightOutput {
            lamp_on: self.lamp_on,
            hours_today: self.hours_today as f32,
            day_start_ms: self.day_start_ms,
        }
    }

    /// Run one control cycle.
    ///
    /// `ambient` is only read when a new sample is due; between samples the
    /// last decision is returned unchanged.
    pub fn tick<S>(
        &mut self,
        now: Millis,
        ambient: &mut S,
        target_hours: f32,
        lamp: &mut dyn Actuator,
    ) -> LightOutput
    where
        S: AmbientLightSensor + ?Sized,
    {
        // ── Day rollover ────────────────────────────────────────────
        if elapsed(now, self.day_start_ms) >= self.cfg.day_length_ms {
            info!(
                hours = format!("{:.2}", self.hours_today),
                "light: day rollover, resetting accumulator"
            );
            self.day_start_ms = now;
            self.hours_today = 0.0;
        }

        // ── Sample gating ───────────────────────────────────────────
        let since_sample = elapsed(now, self.last_sample_ms);
        if since_sample < self.cfg.sample_interval_ms {
            return self.output();
        }
        self.last_sample_ms = now;

        let raw = ambient.read_raw();
        let dark = raw < self.cfg.dark_threshold;

        // ── Paced decision ──────────────────────────────────────────
        let target = f64::from(target_hours);
        let in_day = elapsed(now, self.day_start_ms);
        let expected = target * self.day_fraction(in_day);
        let behind = self.hours_today + SCHEDULE_EPSILON_HRS < expected;
        let lamp_on = dark && behind && target > 0.0 && self.hours_today < target;

        // ── Accumulate effective light ──────────────────────────────
        // Time before the current day started is never credited to it.
        if !dark || lamp_on {
            let credit_ms = since_sample.min(in_day);
            self.hours_today = (self.hours_today + f64::from(credit_ms) / MS_PER_HOUR)
                .clamp(0.0, MAX_HOURS_PER_DAY);
        }

        if lamp_on != self.lamp_on {
            debug!(
                raw,
                hours = format!("{:.3}", self.hours_today),
                expected = format!("{expected:.3}"),
                "light: lamp {}",
                if lamp_on { "ON" } else { "OFF" }
            );
        }
        lamp.set_on(lamp_on);
        self.lamp_on = lamp_on;

        self.output()
    }

    /// Portion of the day elapsed, in `[0, 1]`.
    fn day_fraction(&self, in_day: Millis) -> f64 {
        if self.cfg.day_length_ms == 0 {
            return 1.0;
        }
        (f64::from(in_day) / f64::from(self.cfg.day_length_ms)).clamp(0.0, 1.0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
