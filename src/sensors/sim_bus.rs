//! Register-level I²C emulation of the APDS9960 and ADT7410.
//!
//! Stands in for the real bus on host builds so the drivers, the
//! [`SensorHub`](super::SensorHub) and the scheduler run unmodified.
//! Clones share the same devices: keep one handle to inject swipes and
//! temperatures after the bus has been moved into the hub.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};

use super::{adt7410, apds9960};
use crate::detect::gesture::Gesture;

/// Bus fault reported by the emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    /// Nobody answered at the address.
    Nack,
    /// Injected with [`SimBus::fail_next`].
    Injected,
}

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Self::Injected => ErrorKind::Bus,
        }
    }
}

struct Apds {
    present: bool,
    regs: [u8; 256],
    ptr: u8,
    fifo: VecDeque<[u8; 4]>,
}

struct Adt {
    present: bool,
    regs: [u8; 16],
    ptr: u8,
}

struct SimState {
    apds: Apds,
    adt: Adt,
    fail_next: u32,
    transactions: u64,
}

#[derive(Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// Both devices present, 20 °C, no swipe pending.
    pub fn new() -> Self {
        let mut apds_regs = [0u8; 256];
        apds_regs[usize::from(apds9960::REG_ID)] = 0xAB;
        let mut adt_regs = [0u8; 16];
        adt_regs[usize::from(adt7410::REG_ID)] = 0xCB;
        let bus = Self {
            state: Arc::new(Mutex::new(SimState {
                apds: Apds {
                    present: true,
                    regs: apds_regs,
                    ptr: 0,
                    fifo: VecDeque::new(),
                },
                adt: Adt {
                    present: true,
                    regs: adt_regs,
                    ptr: 0,
                },
                fail_next: 0,
                transactions: 0,
            })),
        };
        bus.set_temperature(20.0);
        bus
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_temperature(&self, celsius: f32) {
        let raw = (celsius * 128.0).round() as i16;
        let [msb, lsb] = raw.to_be_bytes();
        let mut s = self.lock();
        s.adt.regs[0] = msb;
        s.adt.regs[1] = lsb;
    }

    /// Queue the FIFO datasets of one swipe in `gesture`'s direction.
    pub fn swipe(&self, gesture: Gesture) {
        const STEPS: u16 = 4;
        let (hi, lo, mid) = (200u16, 20u16, 100u8);
        let mut s = self.lock();
        for i in 0..STEPS {
            // Balance sweeps from one photodiode pair member to the other.
            let a = (hi - (hi - lo) * i / (STEPS - 1)) as u8;
            let b = (lo + (hi - lo) * i / (STEPS - 1)) as u8;
            let ds = match gesture {
                Gesture::Up => [a, b, mid, mid],
                Gesture::Down => [b, a, mid, mid],
                Gesture::Left => [mid, mid, a, b],
                Gesture::Right => [mid, mid, b, a],
            };
            s.apds.fifo.push_back(ds);
        }
    }

    /// Make the next `n` transactions fail.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    pub fn set_present(&self, address: u8, present: bool) {
        let mut s = self.lock();
        match address {
            apds9960::ADDRESS => s.apds.present = present,
            adt7410::ADDRESS => s.adt.present = present,
            _ => {}
        }
    }

    /// Last value written to an APDS9960 register.
    pub fn apds_register(&self, reg: u8) -> u8 {
        self.lock().apds.regs[usize::from(reg)]
    }

    pub fn adt_register(&self, reg: u8) -> u8 {
        self.lock().adt.regs[usize::from(reg & 0x0F)]
    }

    pub fn transactions(&self) -> u64 {
        self.lock().transactions
    }
}

impl Apds {
    fn write(&mut self, bytes: &[u8]) {
        let Some((&reg, data)) = bytes.split_first() else {
            return;
        };
        self.ptr = reg;
        for &b in data {
            self.regs[usize::from(self.ptr)] = b;
            self.ptr = self.ptr.wrapping_add(1);
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        if self.ptr == apds9960::REG_GFIFO_U {
            for chunk in buf.chunks_mut(4) {
                let ds = self.fifo.pop_front().unwrap_or_default();
                chunk.copy_from_slice(&ds[..chunk.len()]);
            }
            return;
        }
        for b in buf.iter_mut() {
            *b = match self.ptr {
                apds9960::REG_GSTATUS => u8::from(!self.fifo.is_empty()),
                apds9960::REG_GFLVL => self.fifo.len().min(32) as u8,
                r => self.regs[usize::from(r)],
            };
            self.ptr = self.ptr.wrapping_add(1);
        }
    }
}

impl Adt {
    fn write(&mut self, bytes: &[u8]) {
        let Some((&reg, data)) = bytes.split_first() else {
            return;
        };
        self.ptr = reg & 0x0F;
        for &b in data {
            // Temperature and ID registers are read-only.
            if !matches!(self.ptr, 0x00 | 0x01 | 0x02 | 0x0B) {
                self.regs[usize::from(self.ptr)] = b;
            }
            self.ptr = (self.ptr + 1) & 0x0F;
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.regs[usize::from(self.ptr)];
            self.ptr = (self.ptr + 1) & 0x0F;
        }
    }
}

impl i2c::ErrorType for SimBus {
    type Error = SimBusError;
}

impl i2c::I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut s = self.lock();
        s.transactions += 1;
        if s.fail_next > 0 {
            s.fail_next -= 1;
            return Err(SimBusError::Injected);
        }
        match address {
            apds9960::ADDRESS if s.apds.present => {
                for op in operations.iter_mut() {
                    match op {
                        Operation::Write(bytes) => s.apds.write(bytes),
                        Operation::Read(buf) => s.apds.read(buf),
                    }
                }
                Ok(())
            }
            adt7410::ADDRESS if s.adt.present => {
                for op in operations.iter_mut() {
                    match op {
                        Operation::Write(bytes) => s.adt.write(bytes),
                        Operation::Read(buf) => s.adt.read(buf),
                    }
                }
                Ok(())
            }
            _ => Err(SimBusError::Nack),
        }
    }
}
