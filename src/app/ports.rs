//! Port traits: the hexagonal boundary between the scheduler and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Scheduler (domain)
//! ```
//!
//! Driven adapters (sensors, pub/sub transport, LED strip, clock, event
//! sinks) implement these traits.  The [`Scheduler`](crate::scheduler::Scheduler)
//! consumes them via generics, so the loop never touches hardware directly
//! and runs unchanged against the recording mocks in the integration tests.

use crate::detect::gesture::Gesture;
use crate::drivers::led_patterns::Rgb;
use crate::error::{LinkError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: pure value sources, no internal state visible to the loop.
pub trait SensorPort {
    /// Current ambient light level (16-bit raw units).
    fn read_light(&mut self) -> Result<u16, SensorError>;

    /// Most recent swipe, if the gesture engine has one ready.
    fn read_gesture(&mut self) -> Result<Option<Gesture>, SensorError>;

    /// Current temperature in degrees Celsius.
    fn read_temperature_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ pub/sub broker)
// ───────────────────────────────────────────────────────────────

/// A message delivered on one of the subscribed feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Feed key or full broker topic.
    pub feed_name: String,
    pub payload: String,
}

impl InboundMessage {
    pub fn new(feed_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            feed_name: feed_name.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe session plus the radio link underneath it.
///
/// Feed names passed in are bare keys (`oak-light`); the adapter maps
/// them onto broker topics.
pub trait TransportPort {
    /// Drain every message queued since the last call.  Never blocks.
    fn pump(&mut self) -> Result<Vec<InboundMessage>, LinkError>;

    /// Queue `value` for `feed`.
    fn publish(&mut self, feed: &str, value: &str) -> Result<(), LinkError>;

    /// Subscribe to `feed` on the current session.
    fn subscribe(&mut self, feed: &str) -> Result<(), LinkError>;

    /// Tear down and restart the link layer (WiFi on the device).
    ///
    /// Both link calls may block for a few seconds; they call
    /// `keep_alive` at least once a second while they wait.
    fn reset_link(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), LinkError>;

    /// Open a fresh broker session.  Subscriptions from the previous
    /// session are gone and must be re-issued.
    fn reconnect_session(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Feedback port (driven adapter: domain → LED strip)
// ───────────────────────────────────────────────────────────────

/// Visual feedback sink.  Every call only selects an effect; the sink
/// animates it from [`service`](Self::service) and never blocks.
pub trait FeedbackSink {
    /// Fill the strip with one colour.
    fn render_solid(&mut self, colour: Rgb);

    /// Ramp up to `colour`, then settle at resting brightness.
    fn fade_in(&mut self, colour: Rgb);

    /// Dim whatever is showing down to black.
    fn fade_out(&mut self);

    /// Run the rainbow cycle.
    fn render_rainbow_sequence(&mut self);

    /// Pulse the current colour to confirm a local gesture.
    fn confirm_selection(&mut self);

    /// Advance the running effect to `now_ms`.
    fn service(&mut self, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.  Never wall-clock.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms`.
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The scheduler emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}
