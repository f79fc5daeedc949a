//! Collaborator seams: sensors feed the core, actuators receive its commands.
//!
//! The core speaks logical ON/OFF only.  Pin numbers and relay polarity live
//! in the driver behind [`Actuator`].

use crate::state::SensorSnapshot;

/// A physical output (lamp, heater, mister).  Idempotent, no feedback.
pub trait Actuator {
    fn set_on(&mut self, on: bool);
}

/// Raw ambient light source (e.g. an LDR divider on an ADC).
///
/// Higher raw values mean brighter light.  Only read when the light
/// scheduler takes a fresh sample.
pub trait AmbientLightSensor {
    fn read_raw(&mut self) -> u16;
}

impl<F: FnMut() -> u16> AmbientLightSensor for F {
    fn read_raw(&mut self) -> u16 {
        self()
    }
}

/// Temperature/humidity source, already decoded.  Invalid reads are
/// signalled through [`SensorSnapshot::valid`], never by a sentinel value.
pub trait ClimateSensor {
    fn read(&mut self) -> SensorSnapshot;
}

/// Actuator that remembers every command.  Used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    pub on: bool,
    pub commands: Vec<bool>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actuator for RecordingActuator {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        self.commands.push(on);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
