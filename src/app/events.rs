//! Outbound node events.
//!
//! The [`Scheduler`](crate::scheduler::Scheduler) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, record in a test).

use crate::detect::change::ChangeSignal;
use crate::detect::gesture::Gesture;
use crate::detect::telemetry::TelemetryReport;
use crate::error::Error;
use crate::feeds::Metric;

/// Structured events emitted by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The scheduler was constructed and is about to connect.
    Started { node: String, peer: String },

    /// A value went out on one of this node's feeds.
    Published { feed: String, value: String },

    /// A message arrived on one of the peer's feeds.
    RemoteReceived { kind: Metric, payload: String },

    /// The light change window opened or closed.
    LightWindow { signal: ChangeSignal },

    /// A raw swipe was seen while capturing a gesture.
    GestureObserved(Gesture),

    /// A gesture episode ended.
    GestureFinalized { gesture: Gesture, elapsed_ms: u64 },

    /// A telemetry report was produced.
    Telemetry(TelemetryReport),

    /// A tick failed; the scheduler is entering recovery.
    LinkLost(Error),

    /// The session is back after `attempts` tries.
    LinkRecovered { attempts: u32 },

    /// Every attempt in the recovery cycle failed.
    RecoveryExhausted { attempts: u32 },
}
