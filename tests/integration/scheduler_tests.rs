//! Integration tests for the Running loop: inbound servicing, gesture
//! capture, light windows and telemetry, all against mock ports.

use crate::mock_ports::{
    FeedbackCall, LinkCall, MockTransport, config, connected, run_until, scheduler_with,
};

use lightlink::app::events::NodeEvent;
use lightlink::detect::change::ChangeSignal;
use lightlink::detect::gesture::Gesture;
use lightlink::drivers::led_patterns::{AMBER, JADE, SOFTWHITE};
use lightlink::feeds::Metric;
use lightlink::scheduler::LinkState;

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_announces_and_subscribes_to_peer_feeds() {
    let mut s = scheduler_with(config(), MockTransport::default());
    assert_eq!(
        s.sink().events[0],
        NodeEvent::Started {
            node: "local".into(),
            peer: "remote".into()
        }
    );

    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.transport().count(&LinkCall::Reset), 0);
    assert_eq!(
        s.transport().subscriptions(),
        ["remote-light", "remote-lightlevel", "remote-status", "remote-temperature"]
    );
    assert!(s.transport().published.is_empty());
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn inbound_messages_drive_feedback_and_acks() {
    let mut s = connected();
    let t = s.transport_mut();
    t.deliver("remote-status", "up");
    t.deliver("remote-light", "True");
    t.deliver("local-status", "down");
    t.deliver("remote-status", "reset");

    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(
        s.feedback().calls,
        [
            FeedbackCall::FadeIn(JADE),
            FeedbackCall::FadeIn(SOFTWHITE),
            FeedbackCall::FadeOut
        ]
    );
    assert_eq!(
        s.transport().published,
        [("remote-status".to_owned(), "reset".to_owned())]
    );
    let received = s.sink().count(|e| matches!(e, NodeEvent::RemoteReceived { .. }));
    assert_eq!(received, 3, "own feed must be ignored");
}

#[test]
fn activity_status_runs_rainbow() {
    let mut s = connected();
    s.transport_mut().deliver("user/feeds/remote-status", "activity");
    s.step();
    assert_eq!(s.feedback().calls, [FeedbackCall::Rainbow]);
    assert_eq!(s.transport().published_on("remote-status"), ["reset"]);
    assert!(s.sink().events.contains(&NodeEvent::RemoteReceived {
        kind: Metric::Status,
        payload: "activity".into()
    }));
}

#[test]
fn inbound_waits_for_the_pump_interval() {
    let mut s = connected();
    s.step(); // pumps at t = 0
    s.transport_mut().deliver("remote-status", "activity");
    s.step();
    assert!(s.feedback().calls.is_empty());

    run_until(&mut s, 1_010);
    assert_eq!(s.feedback().calls, [FeedbackCall::Rainbow]);
    assert_eq!(s.transport().count(&LinkCall::Pump), 2);
}

// ── Gestures ──────────────────────────────────────────────────

#[test]
fn gesture_episode_publishes_last_direction_once() {
    let mut s = connected();
    s.sensors_mut().queue_swipe(Gesture::Up);
    s.sensors_mut().queue_swipe(Gesture::Left);

    assert_eq!(s.step(), LinkState::Running);

    assert_eq!(
        s.transport().published,
        [("local-status".to_owned(), "left".to_owned())]
    );
    assert_eq!(
        s.feedback().calls,
        [
            FeedbackCall::Solid(JADE),
            FeedbackCall::Solid(AMBER),
            FeedbackCall::Confirm
        ]
    );
    // First swipe at 0, second at 10, quiet for 5 s after that.
    assert!(s.sink().events.contains(&NodeEvent::GestureFinalized {
        gesture: Gesture::Left,
        elapsed_ms: 5_010
    }));
    assert_eq!(s.clock().now, 5_020);
    assert!(!s.state().gestures.is_open());
}

#[test]
fn capture_keeps_strip_and_watchdog_serviced() {
    let mut s = connected();
    s.sensors_mut().queue_swipe(Gesture::Down);
    let feeds_before = s.watchdog().feed_count();
    s.step();
    // One service and one feed per 10 ms poll over the 5 s timeout.
    assert!(s.feedback().services >= 499);
    assert!(s.watchdog().feed_count() - feeds_before >= 499);
}

// ── Light window ──────────────────────────────────────────────

#[test]
fn light_change_opens_and_closes_window() {
    let mut s = connected();
    for _ in 0..5 {
        s.step();
    }
    s.sensors_mut().light = 5_000;
    s.step();
    assert_eq!(s.transport().published_on("local-light"), ["True"]);
    assert!(s.state().detector.is_active());

    // Still changing or holding: nothing new.
    for _ in 0..100 {
        s.step();
    }
    assert_eq!(s.transport().published_on("local-light"), ["True"]);

    let now = s.clock().now;
    run_until(&mut s, now + 25_000);
    assert_eq!(s.transport().published_on("local-light"), ["True", "False"]);
    assert!(!s.state().detector.is_active());
    assert_eq!(
        s.sink().count(|e| matches!(
            e,
            NodeEvent::LightWindow {
                signal: ChangeSignal::Opened | ChangeSignal::Closed
            }
        )),
        2
    );
}

#[test]
fn steady_light_publishes_nothing() {
    let mut s = connected();
    run_until(&mut s, 20_000);
    assert!(s.transport().published_on("local-light").is_empty());
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_reports_every_interval() {
    let mut s = connected();
    run_until(&mut s, 95_000);

    // 21.5 °C is 70.7 °F.
    assert_eq!(s.transport().published_on("local-temperature"), ["71", "71", "71"]);
    assert_eq!(
        s.transport().published_on("local-lightlevel"),
        ["1000", "1000", "1000"]
    );
    assert_eq!(s.sensors_mut().temperature_reads, 3);
    assert_eq!(s.sink().count(|e| matches!(e, NodeEvent::Telemetry(_))), 3);
}

#[test]
fn telemetry_uses_configured_rounding() {
    use lightlink::config::RoundingMode;

    let mut cfg = config();
    cfg.fahrenheit_rounding = RoundingMode::HalfAwayFromZero;
    let mut s = scheduler_with(cfg, MockTransport::default());
    // 22.5 °C is exactly 72.5 °F.
    s.sensors_mut().celsius = 22.5;
    s.step();
    run_until(&mut s, 30_010);
    assert_eq!(s.transport().published_on("local-temperature"), ["73"]);

    let mut s = connected();
    s.sensors_mut().celsius = 22.5;
    run_until(&mut s, 30_010);
    assert_eq!(s.transport().published_on("local-temperature"), ["72"]);
}
