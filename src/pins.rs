//! Pin and bus assignments for the LightLink node board (ESP32-S3).
//!
//! | Signal            | GPIO | Peripheral       |
//! |-------------------|------|------------------|
//! | Light sensor      | 5    | ADC1 channel 4   |
//! | I²C SDA           | 8    | I2C0             |
//! | I²C SCL           | 9    | I2C0             |
//! | WS2812 strip data | 16   | RMT channel 0    |
//!
//! esp-idf-hal hands pins out as typed singletons, so `main` takes
//! `gpio8`, `gpio9` and `gpio16` by name; keep it in step with this table.
//! Only the values drivers need at runtime live here as constants.

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// Ambient light phototransistor on GPIO 5, read through ADC1 channel 4.
pub const LIGHT_ADC_CHANNEL: u32 = 4;

// ---------------------------------------------------------------------------
// I²C bus (APDS9960 gesture @ 0x39, ADT7410 temperature @ 0x48)
// ---------------------------------------------------------------------------

/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;
