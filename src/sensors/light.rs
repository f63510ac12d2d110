//! Ambient light sensor (phototransistor into ADC1).
//!
//! The 12-bit conversion is widened to the 16-bit range so thresholds are
//! expressed in the same units on every board.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the light channel via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

static SIM_LIGHT_LEVEL: AtomicU16 = AtomicU16::new(0);

/// Inject the 16-bit level the next reads return.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light(level: u16) {
    SIM_LIGHT_LEVEL.store(level, Ordering::Relaxed);
}

/// Widen a 12-bit sample to 16 bits (`0xFFF → 0xFFFF`).
pub fn widen_12bit(raw: u16) -> u16 {
    let raw = raw & 0x0FFF;
    (raw << 4) | (raw >> 8)
}

pub struct LightSensor {
    _adc_channel: u32,
}

impl LightSensor {
    pub fn new(adc_channel: u32) -> Self {
        Self {
            _adc_channel: adc_channel,
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> Result<u16, SensorError> {
        hw_init::adc1_read(self._adc_channel)
            .map(widen_12bit)
            .ok_or(SensorError::AdcReadFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> Result<u16, SensorError> {
        Ok(SIM_LIGHT_LEVEL.load(Ordering::Relaxed))
    }
}
