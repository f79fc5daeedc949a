//! ADS1115 16-bit ADC driver over I2C for the ambient light (LDR) channel.
//!
//! Reads one single-ended channel at PGA ±4.096 V, 128 SPS, single-shot
//! mode, and rescales the 15-bit result to the 10-bit range the dark
//! threshold is expressed in.

use greenhouse_core::AmbientLightSensor;
use rppal::i2c::I2c;
use std::{thread, time::Duration};

// ── ADS1115 register addresses ──────────────────────────────────────────────

/// Conversion result register (read-only, 16-bit signed).
const REG_CONVERSION: u8 = 0x00;
/// Configuration register (read/write).
const REG_CONFIG: u8 = 0x01;

// ── Config register bit fields ──────────────────────────────────────────────
//
// Layout (MSB first):
//   [15]    OS      : write 1 to start single-shot conversion
//   [14:12] MUX     : input multiplexer (channel selection)
//   [11:9]  PGA     : programmable gain amplifier
//   [8]     MODE    : 0 = continuous, 1 = single-shot
//   [7:5]   DR      : data rate
//   [4]     COMP_MODE
//   [3]     COMP_POL
//   [2]     COMP_LAT
//   [1:0]   COMP_QUE: 11 = disable comparator (default)

/// OS=1 (start), PGA=001 (±4.096 V), MODE=1 (single-shot),
/// DR=100 (128 SPS), COMP_QUE=11 (comparator off).
const CONFIG_BASE: u16 = 0b1_000_001_1_100_0_0_0_11;

/// MUX values for single-ended reads (AINx vs GND).
const MUX_SHIFT: u8 = 12;
const MUX_SINGLE_ENDED: [u16; 4] = [0b100, 0b101, 0b110, 0b111];

const MAX_CHANNEL: usize = 3;

/// Conversion time at 128 SPS is ~7.8 ms.
const CONVERSION_WAIT: Duration = Duration::from_millis(9);

/// Bit 15 of the config register: conversion-ready flag when read.
const OS_READY_BIT: u16 = 1 << 15;

/// 15-bit single-ended full scale → 10-bit.
const SCALE_SHIFT: u32 = 5;

/// Build the config register value for a single-ended read on `channel`.
fn config_for_channel(channel: usize) -> u16 {
    CONFIG_BASE | (MUX_SINGLE_ENDED[channel] << MUX_SHIFT)
}

/// Clamp a signed conversion to the single-ended range and rescale.
fn to_ten_bit(raw: i16) -> u16 {
    let clamped = i32::from(raw).clamp(0, i32::from(i16::MAX)) as u32;
    (clamped >> SCALE_SHIFT) as u16
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// LDR on one ADS1115 input, backed by `rppal::i2c`.
pub struct Ads1115Light {
    i2c: I2c,
    channel: usize,
    /// Returned when a read fails.
    last_good: u16,
}

impl Ads1115Light {
    /// Open I2C bus 1 and configure for ADS1115 at `addr`.
    pub fn new(addr: u16, channel: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(
            channel <= MAX_CHANNEL,
            "ADS1115 channel {channel} out of range (0–{MAX_CHANNEL})",
        );

        let mut i2c = I2c::new()?;
        i2c.set_slave_address(addr)?;

        tracing::info!(
            addr = format_args!("0x{addr:02x}"),
            channel,
            "ads1115 light sensor initialised"
        );

        Ok(Self {
            i2c,
            channel,
            last_good: 0,
        })
    }

    /// Perform a single-shot read, returning the raw 16-bit signed value.
    fn read_channel(&mut self) -> anyhow::Result<i16> {
        let config = config_for_channel(self.channel);
        self.i2c.block_write(REG_CONFIG, &config.to_be_bytes())?;

        thread::sleep(CONVERSION_WAIT);

        for _ in 0..3 {
            let mut buf = [0u8; 2];
            self.i2c.block_read(REG_CONFIG, &mut buf)?;
            if u16::from_be_bytes(buf) & OS_READY_BIT != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let mut buf = [0u8; 2];
        self.i2c.block_read(REG_CONVERSION, &mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl AmbientLightSensor for Ads1115Light {
    fn read_raw(&mut self) -> u16 {
        match self.read_channel() {
            Ok(raw) => {
                self.last_good = to_ten_bit(raw);
                self.last_good
            }
            Err(e) => {
                tracing::error!(
                    channel = self.channel,
                    last_good = self.last_good,
                    "light adc read failed: {e}"
                );
                self.last_good
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
