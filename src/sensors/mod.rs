//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns the shared I²C bus and every sensor driver, and is the
//! node's [`SensorPort`].

pub mod adt7410;
pub mod apds9960;
pub mod light;
#[cfg(not(target_os = "espidf"))]
pub mod sim_bus;

use embedded_hal::i2c::I2c;

use crate::app::ports::SensorPort;
use crate::detect::gesture::Gesture;
use crate::error::SensorError;
use adt7410::Adt7410;
use apds9960::Apds9960;
use light::LightSensor;

/// Aggregates all sensor drivers behind one bus.
pub struct SensorHub<I> {
    bus: I,
    pub light: LightSensor,
    pub gesture: Apds9960,
    pub thermometer: Adt7410,
}

impl<I: I2c> SensorHub<I> {
    /// Construct a new hub.  Pass in the bus and light sensor (built in
    /// main where peripheral ownership is established).
    pub fn new(bus: I, light: LightSensor) -> Self {
        Self {
            bus,
            light,
            gesture: Apds9960::new(),
            thermometer: Adt7410::new(),
        }
    }

    /// Probe and configure both I²C devices.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.gesture.init(&mut self.bus)?;
        self.thermometer.init(&mut self.bus)?;
        Ok(())
    }

    pub fn bus(&self) -> &I {
        &self.bus
    }
}

impl<I: I2c> SensorPort for SensorHub<I> {
    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.light.read()
    }

    fn read_gesture(&mut self) -> Result<Option<Gesture>, SensorError> {
        self.gesture.read_gesture(&mut self.bus)
    }

    fn read_temperature_celsius(&mut self) -> Result<f32, SensorError> {
        self.thermometer.read_celsius(&mut self.bus)
    }
}
