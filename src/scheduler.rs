//! Main scheduler: the node's single-threaded control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Connecting ──▶ Running ──(tick error)──▶ RecoveringLink     │
//! │                    ▲                            │            │
//! │                    └──────(cycle finished)──────┘            │
//! └──────────────────────────────────────────────────────────────┘
//!
//!  Running, one tick:
//!    1. pump inbound queue (at most once per pump interval) → router → strip
//!    2. poll gesture; if a swipe is seen, capture until the episode ends
//!    3. poll light → ChangeDetector → publish True / False
//!    4. telemetry gate → publish light level + temperature
//!    5. service strip, feed watchdog, sleep the tick interval
//! ```
//!
//! A recovery cycle resets the link (except before the very first
//! connection), opens a new broker session and re-subscribes the peer
//! feeds, retrying with a doubling backoff.  Whether it succeeds or runs
//! out of attempts, the scheduler returns to `Running`; detector rings,
//! open windows, gesture episodes and the telemetry cadence all survive.
//!
//! After a cycle gives up the node runs offline: the pump and every
//! publish are skipped while sensing and local feedback carry on, and a
//! single reconnect attempt is made every `recovery.offline_retry_ms`.

use log::{debug, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::{Clock, EventSink, FeedbackSink, SensorPort, TransportPort};
use crate::config::NodeConfig;
use crate::detect::change::{ChangeDetector, ChangeSignal};
use crate::detect::gesture::{Gesture, GestureAccumulator};
use crate::detect::telemetry::TelemetryPublisher;
use crate::drivers::watchdog::Watchdog;
use crate::error::{Error, LinkError, Result};
use crate::feeds::{FeedNames, Metric};
use crate::router::RemoteEventRouter;

/// Backoff sleeps are split into slices this long so the watchdog and
/// the strip keep being serviced.
const SLEEP_SLICE_MS: u32 = 1_000;

// ═══════════════════════════════════════════════════════════════
//  State
// ═══════════════════════════════════════════════════════════════

/// Link-level state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No session has been opened yet.
    Connecting,
    /// Ticking normally.
    Running,
    /// The last tick failed with `cause`; the next step runs a recovery cycle.
    RecoveringLink { cause: Error },
}

/// Everything the loop remembers between ticks.
pub struct SchedulerState {
    pub detector: ChangeDetector,
    pub gestures: GestureAccumulator,
    pub telemetry: TelemetryPublisher,
    /// Instant of the last successful inbound pump.
    pub last_pump: Option<u64>,
    /// Most recent light reading.
    pub last_light: Option<u16>,
    /// Completed ticks.
    pub ticks: u64,
    /// Recovery cycles and offline retries run after the initial connection.
    pub recoveries: u32,
    /// Set while offline: when the next reconnect attempt is due.
    pub offline_retry_at: Option<u64>,
}

impl SchedulerState {
    pub fn new(config: &NodeConfig, now_ms: u64) -> Self {
        Self {
            detector: ChangeDetector::new(config.light_change_threshold, config.light_hold_ms),
            gestures: GestureAccumulator::new(config.gesture_timeout_ms),
            telemetry: TelemetryPublisher::new(
                now_ms,
                config.telemetry_interval_ms,
                config.fahrenheit_rounding,
            ),
            last_pump: None,
            last_light: None,
            ticks: 0,
            recoveries: 0,
            offline_retry_at: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<S, T, F, C, E> {
    config: NodeConfig,
    router: RemoteEventRouter,
    state: SchedulerState,
    link: LinkState,
    connected_once: bool,
    sensors: S,
    transport: T,
    feedback: F,
    clock: C,
    sink: E,
    watchdog: Watchdog,
}

impl<S, T, F, C, E> Scheduler<S, T, F, C, E>
where
    S: SensorPort,
    T: TransportPort,
    F: FeedbackSink,
    C: Clock,
    E: EventSink,
{
    pub fn new(
        config: NodeConfig,
        sensors: S,
        transport: T,
        feedback: F,
        clock: C,
        mut sink: E,
    ) -> Self {
        let feeds = FeedNames::new(&config.node_name, &config.peer_name);
        let state = SchedulerState::new(&config, clock.now_ms());
        sink.emit(&NodeEvent::Started {
            node: config.node_name.clone(),
            peer: config.peer_name.clone(),
        });
        Self {
            router: RemoteEventRouter::new(feeds),
            state,
            link: LinkState::Connecting,
            connected_once: false,
            sensors,
            transport,
            feedback,
            clock,
            sink,
            watchdog: Watchdog::new(),
            config,
        }
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// One iteration of the state machine: either a recovery cycle or a tick.
    pub fn step(&mut self) -> LinkState {
        self.link = match self.link {
            LinkState::Connecting | LinkState::RecoveringLink { .. } => {
                self.recover();
                LinkState::Running
            }
            LinkState::Running => self.run_tick(),
        };
        self.link
    }

    fn run_tick(&mut self) -> LinkState {
        if !self.transport.is_connected() {
            match self.state.offline_retry_at {
                None => return self.link_lost(LinkError::NotConnected.into()),
                Some(at) if self.clock.now_ms() >= at => self.retry_offline(),
                Some(_) => {}
            }
        }

        match self.tick() {
            Ok(()) => LinkState::Running,
            Err(cause) if self.is_offline() => {
                // No new cycle while offline; the retry timer owns reconnects.
                warn!("offline tick failed: {}", cause);
                self.sleep_serviced(self.config.tick_interval_ms);
                LinkState::Running
            }
            Err(cause) => self.link_lost(cause),
        }
    }

    fn link_lost(&mut self, cause: Error) -> LinkState {
        warn!("tick failed: {} (recoverable: {})", cause, cause.is_recoverable());
        self.sink.emit(&NodeEvent::LinkLost(cause));
        LinkState::RecoveringLink { cause }
    }

    /// Running without a broker session after recovery gave up.
    pub fn is_offline(&self) -> bool {
        self.state.offline_retry_at.is_some() && !self.transport.is_connected()
    }

    // ── Recovery ──────────────────────────────────────────────

    fn recover(&mut self) {
        let policy = self.config.recovery;
        let first = !self.connected_once;
        if !first {
            self.state.recoveries += 1;
        }
        let mut backoff = policy.initial_backoff_ms;

        for attempt in 1..=policy.max_attempts {
            // The radio is fresh at boot; only later attempts reset it.
            let reset = !(first && attempt == 1);
            match self.connect(reset) {
                Ok(()) => {
                    self.connected_once = true;
                    self.state.offline_retry_at = None;
                    info!("link up (attempt {}/{})", attempt, policy.max_attempts);
                    self.sink.emit(&NodeEvent::LinkRecovered { attempts: attempt });
                    return;
                }
                Err(e) => {
                    warn!("link attempt {}/{} failed: {}", attempt, policy.max_attempts, e);
                    if attempt < policy.max_attempts {
                        self.sleep_serviced(backoff);
                        backoff = backoff.saturating_mul(2).min(policy.max_backoff_ms);
                    }
                }
            }
        }

        self.connected_once = true;
        self.schedule_offline_retry();
        warn!("link recovery exhausted; continuing offline");
        self.sink.emit(&NodeEvent::RecoveryExhausted {
            attempts: policy.max_attempts,
        });
    }

    /// A single reconnect attempt while offline.  No backoff sleeps, so
    /// sensing resumes straight after a failed attempt.
    fn retry_offline(&mut self) {
        self.state.recoveries += 1;
        match self.connect(true) {
            Ok(()) => {
                self.state.offline_retry_at = None;
                info!("link back up after running offline");
                self.sink.emit(&NodeEvent::LinkRecovered { attempts: 1 });
            }
            Err(e) => {
                self.schedule_offline_retry();
                warn!("offline reconnect failed: {}", e);
            }
        }
    }

    fn schedule_offline_retry(&mut self) {
        let at = self.clock.now_ms() + u64::from(self.config.recovery.offline_retry_ms);
        self.state.offline_retry_at = Some(at);
    }

    fn connect(&mut self, reset: bool) -> core::result::Result<(), LinkError> {
        // Blocking link calls invoke this between waits.
        let feedback = &mut self.feedback;
        let watchdog = &mut self.watchdog;
        let clock = &self.clock;
        let mut keep_alive = || {
            feedback.service(clock.now_ms());
            watchdog.feed();
        };

        if reset {
            self.transport.reset_link(&mut keep_alive)?;
        }
        self.transport.reconnect_session(&mut keep_alive)?;
        for feed in self.router.feeds().all_inbound() {
            self.transport.subscribe(&feed)?;
        }
        Ok(())
    }

    fn sleep_serviced(&mut self, ms: u32) {
        let mut remaining = ms;
        while remaining > 0 {
            let slice = remaining.min(SLEEP_SLICE_MS);
            self.clock.sleep_ms(slice);
            remaining -= slice;
            self.feedback.service(self.clock.now_ms());
            self.watchdog.feed();
        }
    }

    // ── Tick ──────────────────────────────────────────────────

    fn tick(&mut self) -> Result<()> {
        // 1. Inbound pump, rate limited, skipped while offline.
        let now = self.clock.now_ms();
        let pump_due = self
            .state
            .last_pump
            .is_none_or(|t| now.saturating_sub(t) >= u64::from(self.config.pump_interval_ms));
        if pump_due && self.transport.is_connected() {
            self.service_inbound()?;
            self.state.last_pump = Some(now);
        }

        // 2. Gesture capture (monopolises the loop until the episode ends).
        self.poll_gesture()?;

        // 3. Light change window.
        let level = self.sensors.read_light()?;
        self.state.last_light = Some(level);
        let now = self.clock.now_ms();
        match self.state.detector.observe(level, now) {
            ChangeSignal::Opened => {
                self.sink.emit(&NodeEvent::LightWindow { signal: ChangeSignal::Opened });
                self.publish(Metric::Light, "True")?;
            }
            ChangeSignal::Closed => {
                self.sink.emit(&NodeEvent::LightWindow { signal: ChangeSignal::Closed });
                self.publish(Metric::Light, "False")?;
            }
            ChangeSignal::Refreshed => debug!("light still changing ({}); hold extended", level),
            ChangeSignal::None => {}
        }

        // 4. Telemetry.
        if let Some(report) = self.state.telemetry.tick(now, level, &mut self.sensors)? {
            self.sink.emit(&NodeEvent::Telemetry(report));
            self.publish(Metric::LightLevel, &report.light_level.to_string())?;
            self.publish(Metric::Temperature, &report.temperature_f.to_string())?;
        }

        // 5. Yield.
        self.feedback.service(now);
        self.watchdog.feed();
        self.clock.sleep_ms(self.config.tick_interval_ms);
        self.state.ticks += 1;
        Ok(())
    }

    /// Drain the inbound queue through the router.  Every message is
    /// rendered even if an acknowledgement fails; the first failure is
    /// returned afterwards.
    fn service_inbound(&mut self) -> Result<()> {
        let messages = self.transport.pump()?;
        let mut first_err: Option<Error> = None;

        for msg in messages {
            let Some((kind, dispatch)) = self.router.route(&msg) else {
                debug!("ignoring message on {}", msg.feed_name);
                continue;
            };
            self.sink.emit(&NodeEvent::RemoteReceived {
                kind,
                payload: msg.payload.clone(),
            });
            dispatch.action.apply(&mut self.feedback);

            if let Some(ack) = dispatch.ack {
                if let Err(e) = self.publish_feed(&ack.feed, &ack.value) {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn poll_gesture(&mut self) -> Result<()> {
        if !self.state.gestures.is_open() {
            let Some(gesture) = self.sensors.read_gesture()? else {
                return Ok(());
            };
            let now = self.clock.now_ms();
            self.state.gestures.observe(Some(gesture), now);
            self.on_swipe(gesture);
        }
        self.capture_gesture()
    }

    /// Poll the gesture sensor in a tight loop until the open episode
    /// finalizes, then publish its direction and confirm locally.
    fn capture_gesture(&mut self) -> Result<()> {
        loop {
            self.clock.sleep_ms(self.config.gesture_poll_interval_ms);
            let reading = self.sensors.read_gesture()?;
            let now = self.clock.now_ms();
            if let Some(g) = reading {
                self.on_swipe(g);
            }
            if let Some(done) = self.state.gestures.observe(reading, now) {
                self.sink.emit(&NodeEvent::GestureFinalized {
                    gesture: done.gesture,
                    elapsed_ms: done.elapsed_ms,
                });
                self.publish(Metric::Status, done.gesture.label())?;
                self.feedback.confirm_selection();
                return Ok(());
            }
            self.feedback.service(now);
            self.watchdog.feed();
        }
    }

    fn on_swipe(&mut self, gesture: Gesture) {
        self.sink.emit(&NodeEvent::GestureObserved(gesture));
        self.feedback.render_solid(gesture.colour());
    }

    fn publish(&mut self, metric: Metric, value: &str) -> Result<()> {
        let feed = self.router.feeds().outbound(metric);
        self.publish_feed(&feed, value)
    }

    fn publish_feed(&mut self, feed: &str, value: &str) -> Result<()> {
        if !self.transport.is_connected() {
            debug!("offline, dropping {} = {}", feed, value);
            return Ok(());
        }
        self.transport.publish(feed, value)?;
        self.sink.emit(&NodeEvent::Published {
            feed: feed.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}
