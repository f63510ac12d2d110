//! Event detection: pure state machines over sensor streams.
//!
//! Nothing here performs I/O except [`telemetry::TelemetryPublisher::tick`],
//! which reads the temperature through a [`SensorPort`](crate::app::ports::SensorPort)
//! only when its gate is open.

pub mod change;
pub mod gesture;
pub mod telemetry;

pub use change::{ChangeDetector, ChangeSignal, ChangeWindow};
pub use gesture::{FinalizedGesture, Gesture, GestureAccumulator, GestureEpisode};
pub use telemetry::{TelemetryPublisher, TelemetryReport, fahrenheit};
