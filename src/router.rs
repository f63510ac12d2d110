//! Remote event routing.
//!
//! Maps each message from the peer onto a feedback [`Action`] and, for the
//! status feed, an acknowledgement that clears the peer's status back to
//! `reset`.  Nothing here fails: unknown feeds and payloads degrade to
//! [`Action::NoOp`] or [`Action::FadeOut`].
//!
//! | feed              | payload                      | action                  | ack                  |
//! |-------------------|------------------------------|-------------------------|----------------------|
//! | `<peer>-lightlevel` | any                        | NoOp                    | -                    |
//! | `<peer>-light`    | `True`                       | FadeIn(soft white)      | -                    |
//! | `<peer>-light`    | anything else                | FadeOut                 | -                    |
//! | `<peer>-status`   | `activity`                   | RenderRainbowSequence   | `<peer>-status=reset`|
//! | `<peer>-status`   | `up` `down` `left` `right`   | FadeIn(gesture colour)  | `<peer>-status=reset`|
//! | `<peer>-status`   | `reset`                      | FadeOut                 | -                    |
//! | `<peer>-status`   | anything else                | FadeOut                 | `<peer>-status=reset`|
//! | `<peer>-temperature` | any                       | NoOp                    | -                    |

use crate::app::ports::{FeedbackSink, InboundMessage};
use crate::detect::gesture::Gesture;
use crate::drivers::led_patterns::{Rgb, SOFTWHITE};
use crate::feeds::{FeedNames, Metric};

/// Status payload that triggers the rainbow.
pub const STATUS_ACTIVITY: &str = "activity";
/// Status payload that means "already handled".
pub const STATUS_RESET: &str = "reset";
/// Light feed payload that opens a change window.
pub const LIGHT_ON: &str = "True";

/// Feedback selected for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RenderSolid(Rgb),
    RenderRainbowSequence,
    FadeIn(Rgb),
    FadeOut,
    NoOp,
}

impl Action {
    pub fn apply(self, sink: &mut impl FeedbackSink) {
        match self {
            Self::RenderSolid(c) => sink.render_solid(c),
            Self::RenderRainbowSequence => sink.render_rainbow_sequence(),
            Self::FadeIn(c) => sink.fade_in(c),
            Self::FadeOut => sink.fade_out(),
            Self::NoOp => {}
        }
    }
}

/// A feed/value pair to publish as a side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub feed: String,
    pub value: String,
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub action: Action,
    pub ack: Option<Ack>,
}

impl Dispatch {
    fn action(action: Action) -> Self {
        Self { action, ack: None }
    }
}

pub struct RemoteEventRouter {
    feeds: FeedNames,
}

impl RemoteEventRouter {
    pub fn new(feeds: FeedNames) -> Self {
        Self { feeds }
    }

    pub fn feeds(&self) -> &FeedNames {
        &self.feeds
    }

    /// Route a raw message.  `None` when the feed is not one of the peer's.
    pub fn route(&self, msg: &InboundMessage) -> Option<(Metric, Dispatch)> {
        let metric = self.feeds.classify(&msg.feed_name)?;
        Some((metric, self.dispatch(metric, &msg.payload)))
    }

    /// Payloads are compared byte for byte, like the peer nodes do.
    pub fn dispatch(&self, metric: Metric, payload: &str) -> Dispatch {
        match metric {
            Metric::LightLevel | Metric::Temperature => Dispatch::action(Action::NoOp),
            Metric::Light => Dispatch::action(if payload == LIGHT_ON {
                Action::FadeIn(SOFTWHITE)
            } else {
                Action::FadeOut
            }),
            Metric::Status => self.dispatch_status(payload),
        }
    }

    fn dispatch_status(&self, payload: &str) -> Dispatch {
        let action = if payload == STATUS_ACTIVITY {
            Action::RenderRainbowSequence
        } else if let Some(g) = Gesture::from_label(payload) {
            Action::FadeIn(g.colour())
        } else {
            Action::FadeOut
        };
        let ack = (payload != STATUS_RESET).then(|| Ack {
            feed: self.feeds.inbound(Metric::Status),
            value: STATUS_RESET.to_owned(),
        });
        Dispatch { action, ack }
    }
}
