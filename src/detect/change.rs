//! Light change detection with hysteresis and a debounce hold.
//!
//! Each sample is compared against the mean of the samples that came
//! *before* it (up to three), then pushed into the ring, evicting the
//! oldest.  A deviation of at least `threshold` opens a change window;
//! further deviations keep it open; `hold_ms` without one closes it.
//!
//! ```text
//!   deviation ──▶ Opened ──▶ (deviation) Refreshed … ──▶ hold elapsed ──▶ Closed
//! ```

use heapless::HistoryBuffer;

/// Number of samples in the moving average.
pub const RING_DEPTH: usize = 3;

/// Outcome of one [`ChangeDetector::observe`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    /// Nothing happened.
    None,
    /// A window opened on this sample.
    Opened,
    /// The open window's hold timer was restarted.
    Refreshed,
    /// The hold elapsed with no fresh deviation; the window closed.
    Closed,
}

/// An open change window.  `None` in the detector means closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeWindow {
    /// Time of the most recent deviation (opening or refresh).
    pub started_at: u64,
}

pub struct ChangeDetector {
    ring: HistoryBuffer<i32, RING_DEPTH>,
    window: Option<ChangeWindow>,
    threshold: i32,
    hold_ms: u64,
}

impl ChangeDetector {
    pub fn new(threshold: u16, hold_ms: u32) -> Self {
        Self {
            ring: HistoryBuffer::new(),
            window: None,
            threshold: i32::from(threshold),
            hold_ms: u64::from(hold_ms),
        }
    }

    /// Feed one light sample taken at `now_ms`.
    pub fn observe(&mut self, level: u16, now_ms: u64) -> ChangeSignal {
        let level = i32::from(level);
        let mut signal = ChangeSignal::None;

        // The very first sample has no history to deviate from.
        if let Some(avg) = self.average() {
            if (f64::from(level) - avg).abs() >= f64::from(self.threshold) {
                signal = match self.window {
                    None => ChangeSignal::Opened,
                    Some(_) => ChangeSignal::Refreshed,
                };
                self.window = Some(ChangeWindow { started_at: now_ms });
            }
        }

        if signal == ChangeSignal::None {
            if let Some(w) = self.window {
                if now_ms.saturating_sub(w.started_at) >= self.hold_ms {
                    self.window = None;
                    signal = ChangeSignal::Closed;
                }
            }
        }

        self.ring.write(level);
        signal
    }

    /// Mean of the retained samples, or `None` before the first one.
    pub fn average(&self) -> Option<f64> {
        let samples = self.ring.as_slice();
        if samples.is_empty() {
            return None;
        }
        let sum: i64 = samples.iter().map(|&v| i64::from(v)).sum();
        Some(sum as f64 / samples.len() as f64)
    }

    pub fn is_active(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<ChangeWindow> {
        self.window
    }

    /// Retained samples, in no particular order.
    pub fn samples(&self) -> &[i32] {
        self.ring.as_slice()
    }
}
