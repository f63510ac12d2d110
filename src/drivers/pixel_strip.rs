//! WS2812B pixel strip output.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the strip through one RMT TX channel, GRB order.
//! On host/test: keeps the last shown frame in memory for inspection.

use crate::drivers::led_patterns::{BLACK, Rgb};

#[cfg(target_os = "espidf")]
use esp_idf_hal::{
    gpio::OutputPin,
    peripheral::Peripheral,
    rmt::{config::TransmitConfig, PinState, Pulse, RmtChannel, TxRmtDriver, VariableLengthSignal},
    sys::EspError,
};

#[cfg(target_os = "espidf")]
use core::time::Duration;

pub struct PixelStrip {
    /// Working frame; written by the effect engine, sent by `show()`.
    pixels: Vec<Rgb>,
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
    #[cfg(target_os = "espidf")]
    bit0: (Pulse, Pulse),
    #[cfg(target_os = "espidf")]
    bit1: (Pulse, Pulse),
    #[cfg(not(target_os = "espidf"))]
    shown: Vec<Rgb>,
    #[cfg(not(target_os = "espidf"))]
    show_count: u64,
}

#[cfg(target_os = "espidf")]
impl PixelStrip {
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = impl OutputPin> + 'static,
        len: usize,
    ) -> Result<Self, EspError> {
        let config = TransmitConfig::new().clock_divider(1);
        let tx = TxRmtDriver::new(channel, pin, &config)?;
        let hz = tx.counter_clock()?;
        let ns = |n| Duration::from_nanos(n);
        let bit0 = (
            Pulse::new_with_duration(hz, PinState::High, &ns(350))?,
            Pulse::new_with_duration(hz, PinState::Low, &ns(800))?,
        );
        let bit1 = (
            Pulse::new_with_duration(hz, PinState::High, &ns(700))?,
            Pulse::new_with_duration(hz, PinState::Low, &ns(600))?,
        );
        log::info!("PixelStrip: {} pixels on RMT", len);
        Ok(Self {
            pixels: vec![BLACK; len],
            tx,
            bit0,
            bit1,
        })
    }

    /// Latch the working frame onto the strip.
    pub fn show(&mut self) {
        if let Err(e) = self.transmit() {
            log::warn!("PixelStrip: transmit failed: {}", e);
        }
    }

    fn transmit(&mut self) -> Result<(), EspError> {
        let mut signal = VariableLengthSignal::new();
        for &(r, g, b) in &self.pixels {
            let grb = (u32::from(g) << 16) | (u32::from(r) << 8) | u32::from(b);
            for bit in (0..24).rev() {
                let (hi, lo) = if (grb >> bit) & 1 == 1 { &self.bit1 } else { &self.bit0 };
                signal.push([hi, lo])?;
            }
        }
        self.tx.start_blocking(&signal)
    }
}

#[cfg(not(target_os = "espidf"))]
impl PixelStrip {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![BLACK; len],
            shown: vec![BLACK; len],
            show_count: 0,
        }
    }

    /// Latch the working frame.
    pub fn show(&mut self) {
        self.shown.copy_from_slice(&self.pixels);
        self.show_count += 1;
    }

    /// Last frame passed to `show()`.
    pub fn shown(&self) -> &[Rgb] {
        &self.shown
    }

    pub fn show_count(&self) -> u64 {
        self.show_count
    }
}

impl PixelStrip {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }
}
