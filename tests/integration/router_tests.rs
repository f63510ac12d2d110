//! Integration tests for `RemoteEventRouter` against a recording strip.

use crate::mock_ports::{FeedbackCall, MockFeedback};

use lightlink::app::ports::InboundMessage;
use lightlink::drivers::led_patterns::{CYAN, MAGENTA, SOFTWHITE};
use lightlink::feeds::{FeedNames, Metric};
use lightlink::router::{Action, RemoteEventRouter};

fn play(router: &RemoteEventRouter, messages: &[(&str, &str)]) -> (MockFeedback, Vec<String>) {
    let mut fb = MockFeedback::default();
    let mut acks = Vec::new();
    for (feed, payload) in messages {
        if let Some((_, d)) = router.route(&InboundMessage::new(*feed, *payload)) {
            d.action.apply(&mut fb);
            if let Some(ack) = d.ack {
                acks.push(format!("{}={}", ack.feed, ack.value));
            }
        }
    }
    (fb, acks)
}

#[test]
fn peer_session_renders_in_order() {
    let router = RemoteEventRouter::new(FeedNames::new("kitchen", "attic"));
    let (fb, acks) = play(
        &router,
        &[
            ("me/feeds/attic-light", "True"),
            ("me/feeds/attic-lightlevel", "51234"),
            ("me/feeds/attic-status", "down"),
            ("me/feeds/attic-status", "reset"),
            ("me/feeds/attic-status", "right"),
            ("me/feeds/attic-temperature", "68"),
            ("me/feeds/attic-light", "False"),
        ],
    );
    assert_eq!(
        fb.calls,
        [
            FeedbackCall::FadeIn(SOFTWHITE),
            FeedbackCall::FadeIn(MAGENTA),
            FeedbackCall::FadeOut,
            FeedbackCall::FadeIn(CYAN),
            FeedbackCall::FadeOut,
        ]
    );
    assert_eq!(acks, ["attic-status=reset", "attic-status=reset"]);
}

#[test]
fn feeds_of_other_nodes_are_not_routed() {
    let router = RemoteEventRouter::new(FeedNames::new("kitchen", "attic"));
    for feed in ["kitchen-status", "attic2-status", "attic-", "attic", "status", ""] {
        assert_eq!(router.route(&InboundMessage::new(feed, "up")), None, "{feed}");
    }
}

#[test]
fn noop_leaves_strip_untouched() {
    let mut fb = MockFeedback::default();
    Action::NoOp.apply(&mut fb);
    assert!(fb.calls.is_empty());

    let router = RemoteEventRouter::new(FeedNames::new("a", "b"));
    let d = router.dispatch(Metric::Temperature, "-40");
    assert_eq!(d.action, Action::NoOp);
    assert_eq!(d.ack, None);
}
