//! Mock port adapters for integration tests.
//!
//! Every mock records what the scheduler asked of it, and exposes knobs
//! for injecting readings and failures.  The clock only moves when the
//! scheduler sleeps, so tests are deterministic.

use std::collections::VecDeque;

use lightlink::app::events::NodeEvent;
use lightlink::app::ports::{
    Clock, EventSink, FeedbackSink, InboundMessage, SensorPort, TransportPort,
};
use lightlink::config::NodeConfig;
use lightlink::detect::gesture::Gesture;
use lightlink::drivers::led_patterns::Rgb;
use lightlink::error::{LinkError, SensorError};
use lightlink::scheduler::Scheduler;

// ── Sensors ───────────────────────────────────────────────────

pub struct MockSensors {
    pub light: u16,
    pub celsius: f32,
    /// Poll results handed out in order; `None` once empty.
    pub gestures: VecDeque<Option<Gesture>>,
    pub fail_light: bool,
    pub fail_temperature: bool,
    pub temperature_reads: u32,
    /// Let this many more gesture reads succeed, then fail the next one.
    pub fail_gesture_after: Option<u32>,
}

impl Default for MockSensors {
    fn default() -> Self {
        Self {
            light: 1_000,
            celsius: 21.5,
            gestures: VecDeque::new(),
            fail_light: false,
            fail_temperature: false,
            temperature_reads: 0,
            fail_gesture_after: None,
        }
    }
}

#[allow(dead_code)]
impl MockSensors {
    pub fn queue_swipe(&mut self, gesture: Gesture) {
        self.gestures.push_back(Some(gesture));
    }
}

impl SensorPort for MockSensors {
    fn read_light(&mut self) -> Result<u16, SensorError> {
        if self.fail_light {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(self.light)
    }

    fn read_gesture(&mut self) -> Result<Option<Gesture>, SensorError> {
        if let Some(left) = self.fail_gesture_after.as_mut() {
            if *left == 0 {
                self.fail_gesture_after = None;
                return Err(SensorError::BusError);
            }
            *left -= 1;
        }
        Ok(self.gestures.pop_front().flatten())
    }

    fn read_temperature_celsius(&mut self) -> Result<f32, SensorError> {
        self.temperature_reads += 1;
        if self.fail_temperature {
            return Err(SensorError::BusError);
        }
        Ok(self.celsius)
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    Reset,
    Reconnect,
    Subscribe(String),
    Pump,
}

#[derive(Default)]
pub struct MockTransport {
    pub calls: Vec<LinkCall>,
    /// Successful publishes, in order.
    pub published: Vec<(String, String)>,
    /// Messages handed to the next pump.
    pub inbound: Vec<InboundMessage>,
    pub fail_connects: u32,
    pub fail_publishes: u32,
    pub fail_pump: Option<LinkError>,
    pub connected: bool,
    /// Times a link call reported progress through `keep_alive`.
    pub keep_alives: u32,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn deliver(&mut self, feed: &str, payload: &str) {
        self.inbound.push(InboundMessage::new(feed, payload));
    }

    pub fn published_on(&self, feed: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(f, _)| f == feed)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn count(&self, call: &LinkCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn subscriptions(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LinkCall::Subscribe(f) => Some(f.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl TransportPort for MockTransport {
    fn pump(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
        self.calls.push(LinkCall::Pump);
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        if let Some(e) = self.fail_pump.take() {
            self.connected = false;
            return Err(e);
        }
        Ok(std::mem::take(&mut self.inbound))
    }

    fn publish(&mut self, feed: &str, value: &str) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        if self.fail_publishes > 0 {
            self.fail_publishes -= 1;
            return Err(LinkError::PublishFailed);
        }
        self.published.push((feed.to_owned(), value.to_owned()));
        Ok(())
    }

    fn subscribe(&mut self, feed: &str) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Subscribe(feed.to_owned()));
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        Ok(())
    }

    fn reset_link(&mut self, _keep_alive: &mut dyn FnMut()) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Reset);
        self.connected = false;
        Ok(())
    }

    fn reconnect_session(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Reconnect);
        keep_alive();
        self.keep_alives += 1;
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(LinkError::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── Feedback ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCall {
    Solid(Rgb),
    FadeIn(Rgb),
    FadeOut,
    Rainbow,
    Confirm,
}

#[derive(Default)]
pub struct MockFeedback {
    pub calls: Vec<FeedbackCall>,
    pub services: u64,
    pub last_service_at: Option<u64>,
}

impl FeedbackSink for MockFeedback {
    fn render_solid(&mut self, colour: Rgb) {
        self.calls.push(FeedbackCall::Solid(colour));
    }

    fn fade_in(&mut self, colour: Rgb) {
        self.calls.push(FeedbackCall::FadeIn(colour));
    }

    fn fade_out(&mut self) {
        self.calls.push(FeedbackCall::FadeOut);
    }

    fn render_rainbow_sequence(&mut self) {
        self.calls.push(FeedbackCall::Rainbow);
    }

    fn confirm_selection(&mut self) {
        self.calls.push(FeedbackCall::Confirm);
    }

    fn service(&mut self, now_ms: u64) {
        self.services += 1;
        self.last_service_at = Some(now_ms);
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Time advances only through `sleep_ms`.
#[derive(Default)]
pub struct ManualClock {
    pub now: u64,
    pub total_slept: u64,
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.now += u64::from(ms);
        self.total_slept += u64::from(ms);
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(event.clone());
    }
}

// ── Assembly ──────────────────────────────────────────────────

pub type TestScheduler =
    Scheduler<MockSensors, MockTransport, MockFeedback, ManualClock, RecordingSink>;

/// Node `local` paired with `remote`, default timings.
pub fn config() -> NodeConfig {
    NodeConfig::default()
}

pub fn scheduler_with(config: NodeConfig, transport: MockTransport) -> TestScheduler {
    Scheduler::new(
        config,
        MockSensors::default(),
        transport,
        MockFeedback::default(),
        ManualClock::default(),
        RecordingSink::default(),
    )
}

/// A scheduler that has completed its first connection.
#[allow(dead_code)]
pub fn connected() -> TestScheduler {
    let mut s = scheduler_with(config(), MockTransport::default());
    s.step();
    s
}

/// Step until the clock reaches `until_ms`.
#[allow(dead_code)]
pub fn run_until(s: &mut TestScheduler, until_ms: u64) {
    while s.clock().now < until_ms {
        s.step();
    }
}
