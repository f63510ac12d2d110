//! Gesture episode accumulation.
//!
//! A swipe opens an episode; every further swipe replaces the remembered
//! direction and restarts the timeout.  Once `timeout_ms` passes with no
//! new swipe the episode finalizes with the *last* direction seen.

use core::fmt;

use crate::drivers::led_patterns::{AMBER, CYAN, JADE, MAGENTA, Rgb};

/// Swipe direction reported by the gesture sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Gesture {
    Up = 0x01,
    Down = 0x02,
    Left = 0x03,
    Right = 0x04,
}

impl Gesture {
    pub const ALL: [Gesture; 4] = [Gesture::Up, Gesture::Down, Gesture::Left, Gesture::Right];

    /// Decode a raw sensor code.  `0` and unknown codes are "no gesture".
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Up),
            0x02 => Some(Self::Down),
            0x03 => Some(Self::Left),
            0x04 => Some(Self::Right),
            _ => None,
        }
    }

    /// Parse the label carried on a status feed.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.label() == label)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Label published on the status feed.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Strip colour associated with this direction.
    pub const fn colour(self) -> Rgb {
        match self {
            Self::Up => JADE,
            Self::Down => MAGENTA,
            Self::Left => AMBER,
            Self::Right => CYAN,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An open episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEpisode {
    pub last: Gesture,
    /// Time of the most recent swipe; the timeout runs from here.
    pub started_at: u64,
    /// Time of the first swipe.
    pub opened_at: u64,
}

/// Emitted once per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizedGesture {
    pub gesture: Gesture,
    /// From the first swipe to finalization.
    pub elapsed_ms: u64,
}

pub struct GestureAccumulator {
    episode: Option<GestureEpisode>,
    timeout_ms: u64,
}

impl GestureAccumulator {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            episode: None,
            timeout_ms: u64::from(timeout_ms),
        }
    }

    /// Feed one poll result.  Returns the finalized episode, if this poll
    /// closed one.
    pub fn observe(&mut self, gesture: Option<Gesture>, now_ms: u64) -> Option<FinalizedGesture> {
        match (gesture, self.episode.as_mut()) {
            (Some(g), None) => {
                self.episode = Some(GestureEpisode {
                    last: g,
                    started_at: now_ms,
                    opened_at: now_ms,
                });
                None
            }
            (Some(g), Some(ep)) => {
                ep.last = g;
                ep.started_at = now_ms;
                None
            }
            (None, Some(ep)) => {
                if now_ms.saturating_sub(ep.started_at) < self.timeout_ms {
                    return None;
                }
                let done = FinalizedGesture {
                    gesture: ep.last,
                    elapsed_ms: now_ms.saturating_sub(ep.opened_at),
                };
                self.episode = None;
                Some(done)
            }
            (None, None) => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.episode.is_some()
    }

    pub fn episode(&self) -> Option<GestureEpisode> {
        self.episode
    }
}
