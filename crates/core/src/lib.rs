//! Decision and scheduling core of the greenhouse controller.
//!
//! Two components run once per control cycle, in a fixed order, against one
//! [`SharedState`] record:
//!
//! 1. [`LightScheduler`] paces a supplemental lamp so the day's effective
//!    light reaches the operator's target.
//! 2. [`ClimateController`] drives the heater and the mister from validated
//!    temperature/humidity with hysteresis and mister duty-cycle timers.
//!
//! Everything here is synchronous and free of I/O.  Sensors and actuators
//! are reached through the small traits in [`io`]; the clock is a wrapping
//! millisecond counter ([`Millis`]).

pub mod climate;
pub mod clock;
pub mod cycle;
pub mod io;
pub mod light;
pub mod state;

pub use climate::{ClimateConfig, ClimateController, ClimateOutput, MisterTimer};
pub use clock::{elapsed, Clock, Millis};
pub use cycle::{ControlCycle, Outputs};
pub use io::{Actuator, AmbientLightSensor, ClimateSensor, RecordingActuator};
pub use light::{LightConfig, LightOutput, LightScheduler};
pub use state::{SensorSnapshot, SharedState, StatusReport, Targets};
