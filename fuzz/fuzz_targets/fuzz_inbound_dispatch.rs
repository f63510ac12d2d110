//! Fuzz target: `RemoteEventRouter::route`
//!
//! Splits the input into a feed name and a payload and routes it.  The
//! router must never panic, must only claim the peer's feeds, and must
//! only ever acknowledge on the peer's status feed.
//!
//! cargo fuzz run fuzz_inbound_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightlink::app::ports::InboundMessage;
use lightlink::feeds::{FeedNames, Metric};
use lightlink::router::{RemoteEventRouter, STATUS_RESET};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let (feed, payload) = text.split_once('\0').unwrap_or((text, ""));

    let router = RemoteEventRouter::new(FeedNames::new("oak", "elm"));
    let Some((metric, dispatch)) = router.route(&InboundMessage::new(feed, payload)) else {
        return;
    };

    assert!(feed.ends_with(&router.feeds().inbound(metric)));
    if let Some(ack) = dispatch.ack {
        assert_eq!(metric, Metric::Status);
        assert_eq!(ack.feed, "elm-status");
        assert_eq!(ack.value, STATUS_RESET);
        assert_ne!(payload, STATUS_RESET);
    }
});
