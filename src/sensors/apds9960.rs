//! APDS9960 gesture engine driver (I²C @ 0x39).
//!
//! The engine fills a 32-entry FIFO with (up, down, left, right) photodiode
//! datasets while an object is above the sensor.  Each poll drains the FIFO
//! and remembers the first and most recent usable datasets; once the engine
//! reports no more valid data the swipe is over and the direction is
//! decoded from how the U/D and L/R balance moved between those two.
//!
//! The driver never owns the bus: every call borrows it, so one bus can be
//! shared with the temperature sensor inside [`SensorHub`](super::SensorHub).

use embedded_hal::i2c::I2c;

use crate::detect::gesture::Gesture;
use crate::error::SensorError;

pub const ADDRESS: u8 = 0x39;

// ── Registers ─────────────────────────────────────────────────

pub const REG_ENABLE: u8 = 0x80;
pub const REG_PPULSE: u8 = 0x8E;
pub const REG_ID: u8 = 0x92;
pub const REG_GPENTH: u8 = 0xA0;
pub const REG_GEXTH: u8 = 0xA1;
pub const REG_GCONF1: u8 = 0xA2;
pub const REG_GCONF2: u8 = 0xA3;
pub const REG_GPULSE: u8 = 0xA6;
pub const REG_GCONF4: u8 = 0xAB;
pub const REG_GFLVL: u8 = 0xAE;
pub const REG_GSTATUS: u8 = 0xAF;
pub const REG_GFIFO_U: u8 = 0xFC;

/// Part IDs seen in the field (genuine parts and common clones).
const KNOWN_IDS: [u8; 3] = [0xAB, 0x9C, 0xA8];

const ENABLE_PON: u8 = 0x01;
const ENABLE_PEN: u8 = 0x04;
const ENABLE_WEN: u8 = 0x08;
const ENABLE_GEN: u8 = 0x40;
const GSTATUS_GVALID: u8 = 0x01;

/// Datasets with any channel at or below this are too dim to trust.
const MIN_CHANNEL: u8 = 10;
/// Minimum change in balance (percent points) that counts as a swipe.
const SENSITIVITY: i32 = 50;
const FIFO_DEPTH: usize = 32;

/// One FIFO entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
}

impl Dataset {
    fn is_usable(&self) -> bool {
        self.up > MIN_CHANNEL
            && self.down > MIN_CHANNEL
            && self.left > MIN_CHANNEL
            && self.right > MIN_CHANNEL
    }

    /// U/D balance in percent, positive towards "up".
    fn ud_ratio(&self) -> i32 {
        ratio(self.up, self.down)
    }

    /// L/R balance in percent, positive towards "left".
    fn lr_ratio(&self) -> i32 {
        ratio(self.left, self.right)
    }
}

fn ratio(a: u8, b: u8) -> i32 {
    let (a, b) = (i32::from(a), i32::from(b));
    (a - b) * 100 / (a + b)
}

/// Decode a swipe from its first and last usable datasets.
pub fn decode(first: Dataset, last: Dataset) -> Option<Gesture> {
    let ud_delta = last.ud_ratio() - first.ud_ratio();
    let lr_delta = last.lr_ratio() - first.lr_ratio();

    let ud = if ud_delta >= SENSITIVITY {
        Some(Gesture::Down)
    } else if ud_delta <= -SENSITIVITY {
        Some(Gesture::Up)
    } else {
        None
    };
    let lr = if lr_delta >= SENSITIVITY {
        Some(Gesture::Right)
    } else if lr_delta <= -SENSITIVITY {
        Some(Gesture::Left)
    } else {
        None
    };

    match (ud, lr) {
        (Some(u), Some(l)) => {
            if ud_delta.abs() >= lr_delta.abs() {
                Some(u)
            } else {
                Some(l)
            }
        }
        (u, l) => u.or(l),
    }
}

pub struct Apds9960 {
    first: Option<Dataset>,
    last: Option<Dataset>,
}

impl Default for Apds9960 {
    fn default() -> Self {
        Self::new()
    }
}

impl Apds9960 {
    pub fn new() -> Self {
        Self {
            first: None,
            last: None,
        }
    }

    /// Verify the part and enable the proximity and gesture engines.
    pub fn init<I: I2c>(&mut self, bus: &mut I) -> Result<(), SensorError> {
        let id = read_reg(bus, REG_ID)?;
        if !KNOWN_IDS.contains(&id) {
            log::warn!("APDS9960: unexpected ID 0x{:02X}", id);
            return Err(SensorError::DeviceNotFound);
        }

        write_reg(bus, REG_ENABLE, 0x00)?;
        write_reg(bus, REG_PPULSE, 0x89)?; // 16 µs, 10 pulses
        write_reg(bus, REG_GPENTH, 40)?;
        write_reg(bus, REG_GEXTH, 30)?;
        write_reg(bus, REG_GCONF1, 0x40)?; // FIFO threshold: 4 datasets
        write_reg(bus, REG_GCONF2, 0x41)?; // 4x gain, 100 mA, 2.8 ms wait
        write_reg(bus, REG_GPULSE, 0xC9)?; // 32 µs, 10 pulses
        write_reg(bus, REG_GCONF4, 0x00)?;
        write_reg(
            bus,
            REG_ENABLE,
            ENABLE_PON | ENABLE_PEN | ENABLE_WEN | ENABLE_GEN,
        )?;

        self.first = None;
        self.last = None;
        log::info!("APDS9960: gesture engine enabled (ID 0x{:02X})", id);
        Ok(())
    }

    /// Drain the FIFO; returns a direction when a swipe has just ended.
    pub fn read_gesture<I: I2c>(&mut self, bus: &mut I) -> Result<Option<Gesture>, SensorError> {
        let status = read_reg(bus, REG_GSTATUS)?;
        if status & GSTATUS_GVALID == 0 {
            return Ok(self.finish());
        }

        let level = usize::from(read_reg(bus, REG_GFLVL)?).min(FIFO_DEPTH);
        if level == 0 {
            return Ok(None);
        }
        let mut buf = [0u8; FIFO_DEPTH * 4];
        let bytes = &mut buf[..level * 4];
        bus.write_read(ADDRESS, &[REG_GFIFO_U], bytes)
            .map_err(|_| SensorError::BusError)?;

        for chunk in bytes.chunks_exact(4) {
            let ds = Dataset {
                up: chunk[0],
                down: chunk[1],
                left: chunk[2],
                right: chunk[3],
            };
            if ds.is_usable() {
                self.first.get_or_insert(ds);
                self.last = Some(ds);
            }
        }
        Ok(None)
    }

    fn finish(&mut self) -> Option<Gesture> {
        let first = self.first.take()?;
        let last = self.last.take()?;
        let gesture = decode(first, last);
        log::trace!("APDS9960: {:?} → {:?} = {:?}", first, last, gesture);
        gesture
    }
}

fn read_reg<I: I2c>(bus: &mut I, reg: u8) -> Result<u8, SensorError> {
    let mut buf = [0u8];
    bus.write_read(ADDRESS, &[reg], &mut buf)
        .map_err(|_| SensorError::BusError)?;
    Ok(buf[0])
}

fn write_reg<I: I2c>(bus: &mut I, reg: u8, value: u8) -> Result<(), SensorError> {
    bus.write(ADDRESS, &[reg, value])
        .map_err(|_| SensorError::BusError)
}
