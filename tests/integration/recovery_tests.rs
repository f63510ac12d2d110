//! Integration tests for link recovery: what sends the loop into
//! `RecoveringLink`, the shape of a recovery cycle, and what survives it.

use crate::mock_ports::{
    FeedbackCall, LinkCall, MockTransport, config, connected, run_until, scheduler_with,
};

use lightlink::app::events::NodeEvent;
use lightlink::detect::gesture::Gesture;
use lightlink::drivers::led_patterns::{AMBER, JADE};
use lightlink::error::{Error, LinkError, SensorError};
use lightlink::scheduler::LinkState;

fn recovering(cause: Error) -> LinkState {
    LinkState::RecoveringLink { cause }
}

#[test]
fn failed_publish_recovers_and_keeps_detector_state() {
    let mut s = connected();
    for _ in 0..3 {
        s.step();
    }
    s.sensors_mut().light = 5_000;
    s.transport_mut().fail_publishes = 1;

    let cause = Error::Link(LinkError::PublishFailed);
    assert_eq!(s.step(), recovering(cause));
    assert!(s.sink().events.contains(&NodeEvent::LinkLost(cause)));
    assert!(s.state().detector.is_active());

    let calls_before = s.transport().calls.len();
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(
        s.transport().calls[calls_before..calls_before + 2],
        [LinkCall::Reset, LinkCall::Reconnect]
    );
    assert_eq!(s.transport().subscriptions().len(), 8);
    assert_eq!(s.sink().events.last(), Some(&NodeEvent::LinkRecovered { attempts: 1 }));
    assert_eq!(s.state().recoveries, 1);

    // The lost "True" is not resent; the window still closes normally.
    let now = s.clock().now;
    run_until(&mut s, now + 25_000);
    assert_eq!(s.transport().published_on("local-light"), ["False"]);
}

#[test]
fn pump_failure_retries_the_pump_after_recovery() {
    let mut s = connected();
    s.transport_mut().fail_pump = Some(LinkError::ConnectionLost);

    assert_eq!(s.step(), recovering(Error::Link(LinkError::ConnectionLost)));
    assert_eq!(s.state().last_pump, None);
    s.step();
    s.step();
    assert_eq!(s.transport().count(&LinkCall::Pump), 2);
    assert!(s.state().last_pump.is_some());
}

#[test]
fn sensor_failure_also_recovers() {
    let mut s = connected();
    s.sensors_mut().fail_light = true;
    assert_eq!(s.step(), recovering(Error::Sensor(SensorError::AdcReadFailed)));
    s.sensors_mut().fail_light = false;
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.transport().count(&LinkCall::Reset), 1);
    assert_eq!(s.step(), LinkState::Running);
}

#[test]
fn failed_ack_still_renders_every_message() {
    let mut s = connected();
    s.transport_mut().deliver("remote-status", "up");
    s.transport_mut().deliver("remote-status", "left");
    s.transport_mut().fail_publishes = 1;

    assert_eq!(s.step(), recovering(Error::Link(LinkError::PublishFailed)));
    assert_eq!(
        s.feedback().calls,
        [FeedbackCall::FadeIn(JADE), FeedbackCall::FadeIn(AMBER)]
    );
    assert_eq!(s.transport().published_on("remote-status"), ["reset"]);
}

#[test]
fn failed_gesture_publish_skips_confirmation() {
    let mut s = connected();
    s.sensors_mut().queue_swipe(Gesture::Up);
    s.transport_mut().fail_publishes = 1;

    assert_eq!(s.step(), recovering(Error::Link(LinkError::PublishFailed)));
    assert_eq!(s.feedback().calls, [FeedbackCall::Solid(JADE)]);
    assert!(!s.state().gestures.is_open());
}

#[test]
fn exhausted_recovery_keeps_running() {
    let mut s = scheduler_with(
        config(),
        MockTransport {
            fail_connects: 100,
            ..MockTransport::default()
        },
    );
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.transport().count(&LinkCall::Reconnect), 5);
    // The boot attempt goes straight to the session.
    assert_eq!(s.transport().count(&LinkCall::Reset), 4);
    assert_eq!(
        s.sink().events.last(),
        Some(&NodeEvent::RecoveryExhausted { attempts: 5 })
    );

    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.state().ticks, 1);
    assert!(s.is_offline());
}

#[test]
fn offline_node_keeps_sensing_between_timed_retries() {
    let mut s = scheduler_with(
        config(),
        MockTransport {
            fail_connects: u32::MAX,
            ..MockTransport::default()
        },
    );
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.clock().now, 30_000);
    assert_eq!(s.state().offline_retry_at, Some(90_000));

    s.sensors_mut().queue_swipe(Gesture::Left);
    for _ in 0..10 {
        assert_eq!(s.step(), LinkState::Running);
    }
    assert_eq!(s.state().ticks, 10);
    assert_eq!(s.state().last_light, Some(1_000));
    assert_eq!(
        s.sink().count(|e| matches!(
            e,
            NodeEvent::GestureFinalized { gesture: Gesture::Left, .. }
        )),
        1
    );
    assert_eq!(s.feedback().calls.last(), Some(&FeedbackCall::Confirm));
    // Nothing reaches the wire and nothing counts as a new link loss.
    assert_eq!(s.transport().count(&LinkCall::Pump), 0);
    assert!(s.transport().published.is_empty());
    assert_eq!(s.sink().count(|e| matches!(e, NodeEvent::LinkLost(_))), 0);

    // One plain attempt per retry interval, no backoff cycle.
    run_until(&mut s, 89_990);
    assert_eq!(s.transport().count(&LinkCall::Reconnect), 5);
    run_until(&mut s, 90_100);
    assert_eq!(s.transport().count(&LinkCall::Reconnect), 6);
    assert_eq!(s.state().recoveries, 1);

    // A sensor fault while offline waits for the timer too.
    s.sensors_mut().fail_light = true;
    let before = s.clock().now;
    assert_eq!(s.step(), LinkState::Running);
    assert!(s.clock().now > before);
    assert_eq!(s.transport().count(&LinkCall::Reconnect), 6);
    s.sensors_mut().fail_light = false;

    // The broker comes back: the next timed attempt restores the session.
    s.transport_mut().fail_connects = 0;
    run_until(&mut s, 150_100);
    assert!(!s.is_offline());
    assert_eq!(s.state().offline_retry_at, None);
    assert_eq!(s.transport().subscriptions().len(), 4);
    assert_eq!(
        s.sink().count(|e| matches!(e, NodeEvent::LinkRecovered { .. })),
        1
    );
    assert!(s.transport().count(&LinkCall::Pump) >= 1);
}

#[test]
fn window_and_episode_survive_failures_mid_capture() {
    let mut cfg = config();
    cfg.pump_interval_ms = 10;
    let mut s = scheduler_with(cfg, MockTransport::default());
    s.step();
    for _ in 0..3 {
        s.step();
    }
    s.sensors_mut().light = 5_000;
    s.step();
    assert_eq!(s.transport().published_on("local-light"), ["True"]);

    // The swipe opens an episode, then the bus fails two polls later.
    s.sensors_mut().queue_swipe(Gesture::Up);
    s.sensors_mut().fail_gesture_after = Some(2);
    assert_eq!(s.step(), recovering(Error::Sensor(SensorError::BusError)));
    let window = s.state().detector.window();
    let episode = s.state().gestures.episode();
    assert!(window.is_some());
    assert!(episode.is_some());

    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.state().detector.window(), window);
    assert_eq!(s.state().gestures.episode(), episode);

    s.transport_mut().fail_pump = Some(LinkError::ConnectionLost);
    assert_eq!(s.step(), recovering(Error::Link(LinkError::ConnectionLost)));
    assert_eq!(s.state().detector.window(), window);
    assert_eq!(s.state().gestures.episode(), episode);
    assert_eq!(s.step(), LinkState::Running);
    assert_eq!(s.state().recoveries, 2);

    // The interrupted episode finishes on the next tick.
    s.step();
    assert_eq!(s.transport().published_on("local-status"), ["up"]);
    assert_eq!(s.feedback().calls.last(), Some(&FeedbackCall::Confirm));
    assert_eq!(s.state().detector.window(), window);
    assert_eq!(s.transport().published_on("local-light"), ["True"]);
}

#[test]
fn backoff_is_capped_and_serviced() {
    let mut cfg = config();
    cfg.recovery.max_attempts = 8;
    cfg.recovery.max_backoff_ms = 10_000;
    let mut s = scheduler_with(
        cfg,
        MockTransport {
            fail_connects: 100,
            ..MockTransport::default()
        },
    );
    s.step();
    // 2 + 4 + 8 + 10 + 10 + 10 + 10 seconds.
    assert_eq!(s.clock().now, 54_000);
    // One per backoff slice plus one per connect wait.
    assert_eq!(s.transport().keep_alives, 8);
    assert_eq!(s.feedback().services, 54 + 8);
    assert_eq!(s.watchdog().feed_count(), 54 + 8);
}

#[test]
fn later_recovery_resets_on_first_attempt() {
    let mut s = connected();
    s.transport_mut().fail_pump = Some(LinkError::ConnectionLost);
    s.transport_mut().fail_connects = 1;
    s.step();
    s.step();
    assert_eq!(s.transport().count(&LinkCall::Reset), 2);
    assert_eq!(s.sink().events.last(), Some(&NodeEvent::LinkRecovered { attempts: 2 }));
    assert_eq!(s.clock().now, 2_000);
}

#[test]
fn silent_disconnect_starts_recovery() {
    let mut s = connected();
    s.transport_mut().connected = false;
    assert_eq!(s.step(), recovering(Error::Link(LinkError::NotConnected)));
    assert_eq!(s.step(), LinkState::Running);
    assert!(s.transport().connected);
    assert!(!s.is_offline());
}
