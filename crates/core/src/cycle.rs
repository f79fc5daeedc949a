//! One control cycle: sensor refresh → light scheduler → climate controller.

use crate::climate::{ClimateConfig, ClimateController};
use crate::clock::Millis;
use crate::io::{Actuator, AmbientLightSensor, ClimateSensor};
use crate::light::{LightConfig, LightScheduler};
use crate::state::SharedState;

/// The three physical outputs, borrowed for the duration of a cycle.
pub struct Outputs<'a> {
    pub lamp: &'a mut dyn Actuator,
    pub heater: &'a mut dyn Actuator,
    pub mister: &'a mut dyn Actuator,
}

/// Owns both decision components and runs them in their fixed order.
pub struct ControlCycle {
    light: LightScheduler,
    climate: ClimateController,
}

impl ControlCycle {
    pub fn new(
        now: Millis,
        light_cfg: LightConfig,
        climate_cfg: ClimateConfig,
        lamp: &mut dyn Actuator,
    ) -> Self {
        Self {
            light: LightScheduler::initialize(now, light_cfg, lamp),
            climate: ClimateController::new(now, climate_cfg),
        }
    }

    /// Run a full cycle to completion, writing every component's fields into
    /// `state`.  Targets are read from `state` and never written.
    pub fn run(
        &mut self,
        now: Millis,
        climate_sensor: &mut dyn ClimateSensor,
        ambient: &mut dyn AmbientLightSensor,
        outputs: Outputs<'_>,
        state: &mut SharedState,
    ) {
        let snap = climate_sensor.read();
        state.apply_snapshot(&snap);

        let targets = state.targets;

        let light = self
            .light
            .tick(now, ambient, targets.light_hours, outputs.lamp);
        state.apply_light(&light);

        let climate = self
            .climate
            .tick(now, &snap, &targets, outputs.heater, outputs.mister);
        state.apply_climate(&climate);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
