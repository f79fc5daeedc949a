//! Lamp, heater, and mister relays via GPIO. The `gpio` feature gates the
//! real rppal driver; without it, a mock implementation logs state changes.
//!
//! Relay polarity lives here.  Everything above this module speaks logical
//! ON/OFF through [`greenhouse_core::Actuator`].

use anyhow::Result;
use greenhouse_core::Actuator;
use tracing::{debug, info};

#[cfg(feature = "gpio")]
use anyhow::Context;
#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

// ---------------------------------------------------------------------------
// Real GPIO relay output (production, requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub(crate) struct RelayOutput {
    name: &'static str,
    pin: OutputPin,
    active_low: bool, // many relay boards are active-low
    on: bool,
}

#[cfg(feature = "gpio")]
impl RelayOutput {
    fn new(gpio: &Gpio, name: &'static str, pin_num: u8, active_low: bool) -> Result<Self> {
        let pin = gpio
            .get(pin_num)
            .with_context(|| format!("failed to claim gpio {pin_num} for {name}"))?
            .into_output();
        let mut out = Self {
            name,
            pin,
            active_low,
            on: false,
        };
        // Fail-safe: ensure "OFF" at startup
        out.write(false);
        info!(output = name, gpio = pin_num, active_low, "relay registered");
        Ok(out)
    }

    fn write(&mut self, on: bool) {
        // active-low relay: LOW = ON, HIGH = OFF
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }

    pub(crate) fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(feature = "gpio")]
impl Actuator for RelayOutput {
    fn set_on(&mut self, on: bool) {
        self.write(on);
        if on != self.on {
            debug!(output = self.name, "relay set {}", if on { "ON" } else { "OFF" });
        }
        self.on = on;
    }
}

// ---------------------------------------------------------------------------
// Mock relay output (development, no hardware, logs state)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub(crate) struct RelayOutput {
    name: &'static str,
    pub(super) on: bool,
    pub(super) writes: usize,
}

#[cfg(not(feature = "gpio"))]
impl RelayOutput {
    fn new(name: &'static str, pin_num: u8) -> Self {
        info!(output = name, gpio = pin_num, "[mock-gpio] registered (not wired)");
        Self {
            name,
            on: false,
            writes: 0,
        }
    }

    pub(crate) fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(not(feature = "gpio"))]
impl Actuator for RelayOutput {
    fn set_on(&mut self, on: bool) {
        if on != self.on {
            debug!(
                output = self.name,
                "[mock-gpio] relay set {}",
                if on { "ON" } else { "OFF" }
            );
        }
        self.on = on;
        self.writes += 1;
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The three greenhouse outputs.  Fields are public to the crate so a control
/// cycle can borrow all three at once.
pub(crate) struct RelayBoard {
    pub(crate) lamp: RelayOutput,
    pub(crate) heater: RelayOutput,
    pub(crate) mister: RelayOutput,
}

impl RelayBoard {
    /// `pins` is `[lamp, heater, mister]` as produced by
    /// [`crate::config::Config::output_pins`].
    #[cfg(feature = "gpio")]
    pub(crate) fn new(pins: [(&'static str, u8); 3], active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().context("failed to open gpio")?;
        let [lamp, heater, mister] = pins;
        Ok(Self {
            lamp: RelayOutput::new(&gpio, lamp.0, lamp.1, active_low)?,
            heater: RelayOutput::new(&gpio, heater.0, heater.1, active_low)?,
            mister: RelayOutput::new(&gpio, mister.0, mister.1, active_low)?,
        })
    }

    #[cfg(not(feature = "gpio"))]
    pub(crate) fn new(pins: [(&'static str, u8); 3], _active_low: bool) -> Result<Self> {
        let [lamp, heater, mister] = pins;
        let board = Self {
            lamp: RelayOutput::new(lamp.0, lamp.1),
            heater: RelayOutput::new(heater.0, heater.1),
            mister: RelayOutput::new(mister.0, mister.1),
        };
        info!("[mock-gpio] relay board initialised (no hardware)");
        Ok(board)
    }

    pub(crate) fn all_off(&mut self) {
        self.lamp.set_on(false);
        self.heater.set_on(false);
        self.mister.set_on(false);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(all(test, not(feature = "gpio")))]
mod tests {
    use super::*;

    fn board() -> RelayBoard {
        RelayBoard::new([("lamp", 17), ("heater", 27), ("mister", 22)], true).unwrap()
    }

    // -- RelayBoard (mock) --------------------------------------------------

    #[test]
    fn new_board_all_off() {
        let b = board();
        assert!(!b.lamp.is_on());
        assert!(!b.heater.is_on());
        assert!(!b.mister.is_on());
    }

    #[test]
    fn set_on_and_off() {
        let mut b = board();
        b.heater.set_on(true);
        assert!(b.heater.is_on());
        assert!(!b.lamp.is_on());
        b.heater.set_on(false);
        assert!(!b.heater.is_on());
    }

    #[test]
    fn set_is_idempotent() {
        let mut b = board();
        b.mister.set_on(true);
        b.mister.set_on(true);
        assert!(b.mister.is_on());
        assert_eq!(b.mister.writes, 2);
    }

    #[test]
    fn all_off_resets_everything() {
        let mut b = board();
        b.lamp.set_on(true);
        b.heater.set_on(true);
        b.mister.set_on(true);
        b.all_off();
        assert!(!b.lamp.on);
        assert!(!b.heater.on);
        assert!(!b.mister.on);
    }

    #[test]
    fn outputs_are_core_actuators() {
        fn drive(a: &mut dyn Actuator) {
            a.set_on(true);
        }
        let mut b = board();
        drive(&mut b.lamp);
        assert!(b.lamp.is_on());
    }
}
