//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the logger (UART /
//! USB-CDC on the device, stderr on the host).  Outbound traffic is
//! marked `-->`, traffic from the peer `<--`.

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::detect::change::ChangeSignal;

/// Adapter that logs every [`NodeEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        match event {
            NodeEvent::Started { node, peer } => {
                info!("START | {} local -->", node.to_uppercase());
                info!("START | <-- {} remote", peer.to_uppercase());
            }
            NodeEvent::Published { feed, value } => {
                info!("    {} = {} -->", feed, value);
            }
            NodeEvent::RemoteReceived { kind, payload } => {
                info!("<-- {}: {}", kind, payload);
            }
            NodeEvent::LightWindow { signal } => match signal {
                ChangeSignal::Opened => info!("LIGHT | changing, hold timer started"),
                ChangeSignal::Closed => info!("LIGHT | settled, hold timer reset"),
                other => info!("LIGHT | {:?}", other),
            },
            NodeEvent::GestureObserved(g) => {
                info!("GESTURE | - {}", g);
            }
            NodeEvent::GestureFinalized { gesture, elapsed_ms } => {
                info!("GESTURE | final: {} after {} ms", gesture, elapsed_ms);
            }
            NodeEvent::Telemetry(r) => {
                info!(
                    "TELEM | light={} | T={}\u{00b0}F",
                    r.light_level, r.temperature_f
                );
            }
            NodeEvent::LinkLost(e) => {
                warn!("LINK | lost: {}", e);
            }
            NodeEvent::LinkRecovered { attempts } => {
                info!("LINK | up after {} attempt(s)", attempts);
            }
            NodeEvent::RecoveryExhausted { attempts } => {
                warn!("LINK | gave up after {} attempts, running offline", attempts);
            }
        }
    }
}
