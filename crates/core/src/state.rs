//! The process-long control record and the per-cycle sensor snapshot.
//!
//! ## Field ownership
//!
//! Each field of [`SharedState`] has exactly one writer:
//!
//! | fields                                              | writer                  |
//! |-----------------------------------------------------|-------------------------|
//! | `temp_c`, `humidity_pct`, `has_valid_climate_sample` | sensor refresh          |
//! | `light_hours_today`, `lamp_on`, `day_start_ms`      | light scheduler         |
//! | `heater_on`, `mister_on`                            | climate controller      |
//! | `targets`                                           | configuration channel   |
//!
//! The writers go through `apply_*` so the table above is the only way in.
//! Readers (reporting, UI) take [`SharedState::to_status`].

use serde::Serialize;

use crate::climate::ClimateOutput;
use crate::clock::Millis;
use crate::light::LightOutput;

// ---------------------------------------------------------------------------
// Operator goals
// ---------------------------------------------------------------------------

/// Operator-set goals.  Read-only to the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Targets {
    pub temp_c: f32,
    pub humidity_pct: f32,
    pub light_hours: f32,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            temp_c: 27.0,
            humidity_pct: 65.0,
            light_hours: 6.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor snapshot
// ---------------------------------------------------------------------------

/// Latest decoded climate reading.  `valid` is false whenever either value is
/// unavailable; in that case both readings are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temp_c: f32,
    pub humidity_pct: f32,
    pub valid: bool,
}

impl SensorSnapshot {
    pub fn invalid() -> Self {
        Self {
            temp_c: f32::NAN,
            humidity_pct: f32::NAN,
            valid: false,
        }
    }

    pub fn valid(temp_c: f32, humidity_pct: f32) -> Self {
        Self::from_reading(Some(temp_c), Some(humidity_pct))
    }

    /// Build a snapshot from a driver read.  Valid only if both values are
    /// present and finite.
    pub fn from_reading(temp_c: Option<f32>, humidity_pct: Option<f32>) -> Self {
        match (temp_c, humidity_pct) {
            (Some(t), Some(h)) if t.is_finite() && h.is_finite() => Self {
                temp_c: t,
                humidity_pct: h,
                valid: true,
            },
            _ => Self::invalid(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SharedState {
    pub temp_c: f32,
    pub humidity_pct: f32,
    pub has_valid_climate_sample: bool,

    pub light_hours_today: f32,
    pub lamp_on: bool,
    pub day_start_ms: Millis,

    pub heater_on: bool,
    pub mister_on: bool,

    pub targets: Targets,
}

/// Read-only view handed to the reporting channel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// `None` while the climate sample is invalid.
    pub temp_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub light_hours_today: f32,
    pub lamp_on: bool,
    pub heater_on: bool,
    pub mister_on: bool,
    pub targets: Targets,
}

impl SharedState {
    /// Safe defaults: all actuators off, readings invalid.
    pub fn new(targets: Targets) -> Self {
        Self {
            temp_c: f32::NAN,
            humidity_pct: f32::NAN,
            has_valid_climate_sample: false,
            light_hours_today: 0.0,
            lamp_on: false,
            day_start_ms: 0,
            heater_on: false,
            mister_on: false,
            targets,
        }
    }

    /// Sensor refresh writes the latest climate reading.
    pub fn apply_snapshot(&mut self, snap: &SensorSnapshot) {
        if snap.valid {
            self.temp_c = snap.temp_c;
            self.humidity_pct = snap.humidity_pct;
        } else {
            self.temp_c = f32::NAN;
            self.humidity_pct = f32::NAN;
        }
        self.has_valid_climate_sample = snap.valid;
    }

    /// Light scheduler writes lamp state and the day's accumulator.
    pub fn apply_light(&mut self, out: &LightOutput) {
        self.lamp_on = out.lamp_on;
        self.light_hours_today = out.hours_today;
        self.day_start_ms = out.day_start_ms;
    }

    /// Climate controller writes heater and mister state.
    pub fn apply_climate(&mut self, out: &ClimateOutput) {
        self.heater_on = out.heater_on;
        self.mister_on = out.mister_on;
    }

    pub fn to_status(&self) -> StatusReport {
        let valid = self.has_valid_climate_sample;
        StatusReport {
            temp_c: valid.then_some(self.temp_c),
            humidity_pct: valid.then_some(self.humidity_pct),
            light_hours_today: self.light_hours_today,
            lamp_on: self.lamp_on,
            heater_on: self.heater_on,
            mister_on: self.mister_on,
            targets: self.targets,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(Targets::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
