//! Feed naming contract shared with the paired node.
//!
//! Every feed is `<prefix>-<metric>`: this node publishes under its own
//! name and subscribes under the peer's.  An unmodified peer relies on
//! these exact strings, so they are never derived any other way.
//!
//! ```text
//!   oak-light        ──▶  broker  ──▶  (elm subscribes)
//!   elm-status       ◀──  broker  ◀──  (elm publishes)
//! ```

use core::fmt;

/// The four metrics exchanged between paired nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Boolean "light is changing" window (`True` / `False`).
    Light,
    /// Raw ambient light level.
    LightLevel,
    /// One-shot trigger: gesture label, `activity`, or `reset`.
    Status,
    /// Temperature in whole degrees Fahrenheit.
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Light,
        Metric::LightLevel,
        Metric::Status,
        Metric::Temperature,
    ];

    /// Wire suffix used in feed names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::LightLevel => "lightlevel",
            Self::Status => "status",
            Self::Temperature => "temperature",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == suffix)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed names for one local/remote pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedNames {
    node: String,
    peer: String,
}

impl FeedNames {
    pub fn new(node: &str, peer: &str) -> Self {
        Self {
            node: node.to_owned(),
            peer: peer.to_owned(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Feed this node publishes `metric` on.
    pub fn outbound(&self, metric: Metric) -> String {
        format!("{}-{}", self.node, metric.as_str())
    }

    /// Peer feed carrying `metric`.
    pub fn inbound(&self, metric: Metric) -> String {
        format!("{}-{}", self.peer, metric.as_str())
    }

    /// Every peer feed, in subscription order.
    pub fn all_inbound(&self) -> [String; 4] {
        Metric::ALL.map(|m| self.inbound(m))
    }

    /// Classify an inbound feed name (bare key or full topic path).
    /// Only `<peer>-<metric>` matches; anything else is `None`.
    pub fn classify(&self, feed_name: &str) -> Option<Metric> {
        let key = feed_from_topic(feed_name);
        let suffix = key.strip_prefix(self.peer.as_str())?.strip_prefix('-')?;
        Metric::from_suffix(suffix)
    }
}

/// Broker topic carrying `feed` for account `username`.
pub fn topic_for(username: &str, feed: &str) -> String {
    if username.is_empty() {
        feed.to_owned()
    } else {
        format!("{username}/feeds/{feed}")
    }
}

/// Feed key at the end of a topic path (`user/feeds/key` → `key`).
pub fn feed_from_topic(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}
