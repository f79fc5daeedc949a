//! Heater and mister control from validated temperature/humidity.
//!
//! ## Heater
//!
//! ```text
//! OFF ──[temp <= target - hyst]──▶ ON
//!  ▲                               │
//!  └──────[temp >= target + hyst]──┘
//! ```
//!
//! ## Mister
//!
//! ```text
//! OFF ──[hum <= target - hyst AND off for >= min_off]──▶ ON
//!  ▲                                                     │
//!  └──[hum >= target + hyst OR on for >= max_on]─────────┘
//! ```
//!
//! `max_on` is a hard ceiling that holds even if humidity never recovers.
//! `min_off` is the rest interval between bursts.  An invalid sample forces
//! both outputs off every cycle until valid data returns.

use tracing::{debug, warn};

use crate::clock::{elapsed, Millis};
use crate::io::Actuator;
use crate::state::{SensorSnapshot, Targets};

// ---------------------------------------------------------------------------
// Configuration / output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateConfig {
    pub temp_hysteresis_c: f32,
    pub humidity_hysteresis_pct: f32,
    /// Longest continuous mister burst.
    pub mister_max_on_ms: Millis,
    /// Shortest rest between mister bursts.
    pub mister_min_off_ms: Millis,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            temp_hysteresis_c: 0.5,
            humidity_hysteresis_pct: 3.0,
            mister_max_on_ms: 20_000,
            mister_min_off_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateOutput {
    pub heater_on: bool,
    pub mister_on: bool,
}

/// Time since the mister entered its current state.  Always agrees with the
/// mister output, so exactly one of the on/off timers is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MisterTimer {
    OnSince(Millis),
    OffSince(Millis),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClimateController {
    cfg: ClimateConfig,
    heater_on: bool,
    mister_on: bool,
    timer: MisterTimer,
}

impl ClimateController {
    /// Outputs start off and the mister rest interval starts at `now`.
    /// No actuator is commanded until the first tick.
    pub fn new(now: Millis, cfg: ClimateConfig) -> Self {
        Self {
            cfg,
            heater_on: false,
            mister_on: false,
            timer: MisterTimer::OffSince(now),
        }
    }

    pub fn timer(&self) -> MisterTimer {
        self.timer
    }

    pub fn output(&self) -> ClimateOutput {
        ClimateOutput {
            heater_on: self.heater_on,
            mister_on: self.mister_on,
        }
    }

    /// Run one control cycle.
    pub fn tick(
        &mut self,
        now: Millis,
        snap: &SensorSnapshot,
        targets: &Targets,
        heater: &mut dyn Actuator,
        mister: &mut dyn Actuator,
    ) -> ClimateOutput {
        if !snap.valid {
            self.fail_safe(now, heater, mister);
            return self.output();
        }

        self.update_heater(snap.temp_c, targets.temp_c, heater);
        self.update_mister(now, snap.humidity_pct, targets.humidity_pct, mister);

        self.output()
    }

    fn fail_safe(&mut self, now: Millis, heater: &mut dyn Actuator, mister: &mut dyn Actuator) {
        if self.heater_on || self.mister_on {
            warn!(
                heater_was_on = self.heater_on,
                mister_was_on = self.mister_on,
                "climate: invalid sample, forcing heater and mister OFF"
            );
        }
        heater.set_on(false);
        mister.set_on(false);
        self.heater_on = false;
        if self.mister_on {
            self.timer = MisterTimer::OffSince(now);
        }
        self.mister_on = false;
    }

    fn update_heater(&mut self, temp: f32, target: f32, heater: &mut dyn Actuator) {
        let hyst = self.cfg.temp_hysteresis_c;
        let next = if !self.heater_on && temp <= target - hyst {
            true
        } else if self.heater_on && temp >= target + hyst {
            false
        } else {
            self.heater_on
        };

        if next != self.heater_on {
            debug!(temp_c = temp, target_c = target, "climate: heater {}", on_off(next));
        }
        heater.set_on(next);
        self.heater_on = next;
    }

    fn update_mister(&mut self, now: Millis, humidity: f32, target: f32, mister: &mut dyn Actuator) {
        // ── Safety ceiling ──────────────────────────────────────────
        if let MisterTimer::OnSince(since) = self.timer {
            if elapsed(now, since) >= self.cfg.mister_max_on_ms {
                warn!(
                    on_ms = elapsed(now, since),
                    max_on_ms = self.cfg.mister_max_on_ms,
                    "climate: mister hit max ON time, forcing OFF"
                );
                self.set_mister(now, false, mister);
                return;
            }
        }

        // ── Hysteresis with backoff ─────────────────────────────────
        let hyst = self.cfg.humidity_hysteresis_pct;
        let rested = match self.timer {
            MisterTimer::OffSince(since) => elapsed(now, since) >= self.cfg.mister_min_off_ms,
            MisterTimer::OnSince(_) => false,
        };

        let next = if !self.mister_on && rested && humidity <= target - hyst {
            true
        } else if self.mister_on && humidity >= target + hyst {
            false
        } else {
            self.mister_on
        };

        if next != self.mister_on {
            debug!(
                humidity_pct = humidity,
                target_pct = target,
                "climate: mister {}",
                on_off(next)
            );
        }
        self.set_mister(now, next, mister);
    }

    /// Command the mister; a state change restarts the matching timer.
    fn set_mister(&mut self, now: Millis, on: bool, mister: &mut dyn Actuator) {
        if on != self.mister_on {
            self.timer = if on {
                MisterTimer::OnSince(now)
            } else {
                MisterTimer::OffSince(now)
            };
        }
        mister.set_on(on);
        self.mister_on = on;
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RecordingActuator;

    struct Rig {
        ctl: ClimateController,
        heater: RecordingActuator,
        mister: RecordingActuator,
        targets: Targets,
    }

    impl Rig {
        fn new(now: Millis) -> Self {
            Self {
                ctl: ClimateController::new(now, ClimateConfig::default()),
                heater: RecordingActuator::new(),
                mister: RecordingActuator::new(),
                targets: Targets::default(),
            }
        }

        fn tick(&mut self, now: Millis, temp: f32, hum: f32) -> ClimateOutput {
            let snap = SensorSnapshot::valid(temp, hum);
            self.ctl
                .tick(now, &snap, &self.targets, &mut self.heater, &mut self.mister)
        }

        fn tick_invalid(&mut self, now: Millis) -> ClimateOutput {
            let snap = SensorSnapshot::invalid();
            self.ctl
                .tick(now, &snap, &self.targets, &mut self.heater, &mut self.mister)
        }
    }

    // -- heater -------------------------------------------------------------

    #[test]
    fn heater_hysteresis_sequence() {
        let mut rig = Rig::new(0);
        assert!(!rig.tick(1_000, 28.0, 65.0).heater_on);
        assert!(rig.tick(2_000, 26.3, 65.0).heater_on);
        assert!(rig.tick(3_000, 26.6, 65.0).heater_on);
    }

    #[test]
    fn heater_turns_on_exactly_at_lower_edge() {
        let mut rig = Rig::new(0);
        assert!(rig.tick(1_000, 26.5, 65.0).heater_on);
    }

    #[test]
    fn heater_turns_off_exactly_at_upper_edge() {
        let mut rig = Rig::new(0);
        rig.tick(1_000, 20.0, 65.0);
        assert!(rig.tick(2_000, 27.4, 65.0).heater_on);
        assert!(!rig.tick(3_000, 27.5, 65.0).heater_on);
    }

    #[test]
    fn heater_stays_off_inside_band() {
        let mut rig = Rig::new(0);
        for t in [27.4, 26.6, 27.0, 26.9] {
            assert!(!rig.tick(1_000, t, 65.0).heater_on);
        }
        assert!(!rig.heater.on);
    }

    // -- mister -------------------------------------------------------------

    #[test]
    fn mister_waits_for_backoff() {
        let mut rig = Rig::new(0);
        assert!(!rig.tick(5_000, 27.0, 60.0).mister_on);
        assert!(rig.tick(11_000, 27.0, 60.0).mister_on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OnSince(11_000));
    }

    #[test]
    fn mister_forced_off_at_max_on() {
        let mut rig = Rig::new(0);
        rig.ctl.mister_on = true;
        rig.ctl.timer = MisterTimer::OnSince(0);

        assert!(rig.tick(19_999, 27.0, 55.0).mister_on);
        assert!(!rig.tick(20_000, 27.0, 55.0).mister_on);
        assert!(!rig.mister.on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OffSince(20_000));
    }

    #[test]
    fn mister_ceiling_skips_on_check_same_cycle() {
        let mut rig = Rig::new(0);
        rig.ctl.mister_on = true;
        rig.ctl.timer = MisterTimer::OnSince(0);

        // humidity still low; must not immediately re-enable
        assert!(!rig.tick(20_000, 27.0, 50.0).mister_on);
        assert!(!rig.tick(25_000, 27.0, 50.0).mister_on);
        assert!(rig.tick(30_000, 27.0, 50.0).mister_on);
    }

    #[test]
    fn mister_turns_off_when_humidity_recovers() {
        let mut rig = Rig::new(0);
        assert!(rig.tick(10_000, 27.0, 60.0).mister_on);
        assert!(rig.tick(12_000, 27.0, 67.9).mister_on);
        assert!(!rig.tick(13_000, 27.0, 68.0).mister_on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OffSince(13_000));
    }

    #[test]
    fn mister_stays_off_inside_band() {
        let mut rig = Rig::new(0);
        assert!(!rig.tick(50_000, 27.0, 62.1).mister_on);
        assert!(!rig.tick(60_000, 27.0, 67.0).mister_on);
    }

    #[test]
    fn mister_timer_not_restarted_while_on() {
        let mut rig = Rig::new(0);
        rig.tick(10_000, 27.0, 60.0);
        rig.tick(12_000, 27.0, 63.0);
        rig.tick(15_000, 27.0, 64.0);
        assert_eq!(rig.ctl.timer(), MisterTimer::OnSince(10_000));
    }

    #[test]
    fn mister_timers_survive_clock_wrap() {
        let start = Millis::MAX - 4_999;
        let mut rig = Rig::new(start);

        assert!(!rig.tick(start.wrapping_add(9_999), 27.0, 55.0).mister_on);
        assert!(rig.tick(start.wrapping_add(10_000), 27.0, 55.0).mister_on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OnSince(5_000));
        assert!(rig.tick(start.wrapping_add(29_999), 27.0, 55.0).mister_on);
        assert!(!rig.tick(start.wrapping_add(30_000), 27.0, 55.0).mister_on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OffSince(25_000));
    }

    // -- fail-safe ----------------------------------------------------------

    #[test]
    fn invalid_sample_forces_everything_off() {
        let mut rig = Rig::new(0);
        rig.tick(10_000, 20.0, 50.0);
        assert!(rig.heater.on);
        assert!(rig.mister.on);

        let out = rig.tick_invalid(11_000);
        assert_eq!(
            out,
            ClimateOutput {
                heater_on: false,
                mister_on: false
            }
        );
        assert!(!rig.heater.on);
        assert!(!rig.mister.on);
        assert_eq!(rig.ctl.timer(), MisterTimer::OffSince(11_000));
    }

    #[test]
    fn invalid_sample_is_idempotent() {
        let mut rig = Rig::new(0);
        for now in [1_000, 2_000, 3_000] {
            let out = rig.tick_invalid(now);
            assert!(!out.heater_on);
            assert!(!out.mister_on);
        }
        assert_eq!(rig.ctl.timer(), MisterTimer::OffSince(0));
    }

    #[test]
    fn backoff_applies_after_fail_safe() {
        let mut rig = Rig::new(0);
        rig.tick(10_000, 27.0, 50.0);
        rig.tick_invalid(12_000);

        assert!(!rig.tick(13_000, 27.0, 50.0).mister_on);
        assert!(rig.tick(22_000, 27.0, 50.0).mister_on);
    }

    #[test]
    fn heater_hysteresis_memory_cleared_by_fail_safe() {
        let mut rig = Rig::new(0);
        rig.tick(1_000, 20.0, 65.0);
        rig.tick_invalid(2_000);
        // inside the band: stays off now that memory is OFF
        assert!(!rig.tick(3_000, 27.0, 65.0).heater_on);
    }
}
