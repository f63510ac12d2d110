//! ADT7410 temperature sensor driver (I²C @ 0x48).
//!
//! Runs in 16-bit continuous mode: 0.0078 °C per LSB, two's complement.

use embedded_hal::i2c::I2c;

use crate::error::SensorError;

pub const ADDRESS: u8 = 0x48;

pub const REG_TEMP_MSB: u8 = 0x00;
pub const REG_CONFIG: u8 = 0x03;
pub const REG_ID: u8 = 0x0B;

/// Upper five ID bits; the low three are the silicon revision.
const MANUFACTURER_ID: u8 = 0xC8;
const CONFIG_16BIT: u8 = 0x80;
const LSB_PER_DEGREE: f32 = 128.0;

/// Outside the part's rated range; a reading here means a bus glitch.
const MIN_CELSIUS: f32 = -55.0;
const MAX_CELSIUS: f32 = 150.0;

/// Convert a raw 16-bit register pair to °C.
pub fn raw_to_celsius(raw: [u8; 2]) -> f32 {
    f32::from(i16::from_be_bytes(raw)) / LSB_PER_DEGREE
}

#[derive(Default)]
pub struct Adt7410 {
    ready: bool,
}

impl Adt7410 {
    pub fn new() -> Self {
        Self { ready: false }
    }

    /// Check the ID register and switch to 16-bit resolution.
    pub fn init<I: I2c>(&mut self, bus: &mut I) -> Result<(), SensorError> {
        let mut id = [0u8];
        bus.write_read(ADDRESS, &[REG_ID], &mut id)
            .map_err(|_| SensorError::BusError)?;
        if id[0] & 0xF8 != MANUFACTURER_ID {
            log::warn!("ADT7410: unexpected ID 0x{:02X}", id[0]);
            return Err(SensorError::DeviceNotFound);
        }
        bus.write(ADDRESS, &[REG_CONFIG, CONFIG_16BIT])
            .map_err(|_| SensorError::BusError)?;
        self.ready = true;
        log::info!("ADT7410: 16-bit mode (rev {})", id[0] & 0x07);
        Ok(())
    }

    pub fn read_celsius<I: I2c>(&mut self, bus: &mut I) -> Result<f32, SensorError> {
        if !self.ready {
            return Err(SensorError::DeviceNotFound);
        }
        let mut raw = [0u8; 2];
        bus.write_read(ADDRESS, &[REG_TEMP_MSB], &mut raw)
            .map_err(|_| SensorError::BusError)?;
        let celsius = raw_to_celsius(raw);
        if !(MIN_CELSIUS..=MAX_CELSIUS).contains(&celsius) {
            return Err(SensorError::OutOfRange);
        }
        Ok(celsius)
    }
}
