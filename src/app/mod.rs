//! Application boundary: port traits and the events the loop emits.
//!
//! The scheduler in [`crate::scheduler`] talks to sensors, the broker, the
//! LED strip and the clock only through the **port traits** defined in
//! [`ports`], keeping the loop fully testable without real peripherals.

pub mod events;
pub mod ports;
