//! LED strip effect engine.
//!
//! Generates time-varying pixel frames for the strip.  An effect is
//! selected with [`EffectEngine::set`]; its clock starts on the next
//! [`EffectEngine::render`] call, and every later call computes the
//! frame for the elapsed time.  Nothing here sleeps.
//!
//! ## Effects
//!
//! | Effect          | Description                                    | Length   |
//! |-----------------|------------------------------------------------|----------|
//! | Solid           | Constant colour at resting brightness          | -        |
//! | FadeIn          | 0 → full brightness, then settle to resting    | 1.5 s    |
//! | FadeOut         | Resting brightness → black                     | 3 s      |
//! | Rainbow         | Colour wheel sweeps the strip, five cycles     | 6 s      |
//! | SelectionPulse  | Three pulses to full, then fade to black       | 5.2 s    |

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Effect identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Off,
    Solid(Rgb),
    FadeIn(Rgb),
    FadeOut,
    Rainbow,
    SelectionPulse,
}

// ── Timings (ms) ──────────────────────────────────────────────

const FADE_IN_RISE_MS: u64 = 1_000;
const FADE_IN_SETTLE_MS: u64 = 500;
const FADE_OUT_MS: u64 = 3_000;
/// Per-cycle sweep times; the rainbow slows down towards the end.
const RAINBOW_CYCLES_MS: [u64; 5] = [600, 600, 600, 1_200, 3_000];
const PULSE_HALF_MS: u64 = 700;
const PULSE_COUNT: u64 = 3;
const PULSE_TAIL_MS: u64 = 1_000;

/// LED effect engine. No heap.
pub struct EffectEngine {
    effect: Effect,
    /// Colour the fades and pulses act on.
    colour: Rgb,
    base_brightness: u8,
    started_at: Option<u64>,
}

impl EffectEngine {
    pub fn new(base_brightness: u8) -> Self {
        Self {
            effect: Effect::Off,
            colour: BLACK,
            base_brightness,
            started_at: None,
        }
    }

    /// Switch to `effect`.  The effect restarts even if it is already running.
    pub fn set(&mut self, effect: Effect) {
        match effect {
            Effect::Solid(c) | Effect::FadeIn(c) => self.colour = c,
            Effect::Off => self.colour = BLACK,
            Effect::FadeOut | Effect::Rainbow | Effect::SelectionPulse => {}
        }
        self.effect = effect;
        self.started_at = None;
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Colour the current effect is built on.
    pub fn colour(&self) -> Rgb {
        self.colour
    }

    /// `true` while the current effect still changes over time.
    pub fn is_animating(&self, now_ms: u64) -> bool {
        let elapsed = self.elapsed(now_ms);
        match self.effect {
            Effect::Off | Effect::Solid(_) => false,
            _ => elapsed < Self::duration(self.effect),
        }
    }

    /// Fill `pixels` with the frame for `now_ms`.  Finished fades and
    /// pulses fall back to [`Effect::Off`].
    pub fn render(&mut self, now_ms: u64, pixels: &mut [Rgb]) {
        let start = *self.started_at.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);

        if matches!(self.effect, Effect::FadeOut | Effect::SelectionPulse)
            && elapsed >= Self::duration(self.effect)
        {
            self.effect = Effect::Off;
            self.colour = BLACK;
        }

        match self.effect {
            Effect::Off => pixels.fill(BLACK),
            Effect::Solid(c) => pixels.fill(scale(c, self.base_brightness)),
            Effect::FadeIn(c) => pixels.fill(scale(c, self.fade_in_level(elapsed))),
            Effect::FadeOut => {
                let level = ramp(self.base_brightness, 0, elapsed, FADE_OUT_MS);
                pixels.fill(scale(self.colour, level));
            }
            Effect::SelectionPulse => {
                let level = self.pulse_level(elapsed);
                pixels.fill(scale(self.colour, level));
            }
            Effect::Rainbow => self.rainbow_frame(elapsed, pixels),
        }
    }

    fn elapsed(&self, now_ms: u64) -> u64 {
        self.started_at.map_or(0, |s| now_ms.saturating_sub(s))
    }

    fn duration(effect: Effect) -> u64 {
        match effect {
            Effect::Off | Effect::Solid(_) => 0,
            Effect::FadeIn(_) => FADE_IN_RISE_MS + FADE_IN_SETTLE_MS,
            Effect::FadeOut => FADE_OUT_MS,
            Effect::Rainbow => RAINBOW_CYCLES_MS.iter().sum(),
            Effect::SelectionPulse => PULSE_COUNT * 2 * PULSE_HALF_MS + PULSE_TAIL_MS,
        }
    }

    fn fade_in_level(&self, elapsed: u64) -> u8 {
        if elapsed < FADE_IN_RISE_MS {
            ramp(0, 255, elapsed, FADE_IN_RISE_MS)
        } else {
            ramp(
                255,
                self.base_brightness,
                elapsed - FADE_IN_RISE_MS,
                FADE_IN_SETTLE_MS,
            )
        }
    }

    fn pulse_level(&self, elapsed: u64) -> u8 {
        let pulses = PULSE_COUNT * 2 * PULSE_HALF_MS;
        if elapsed >= pulses {
            return ramp(self.base_brightness, 0, elapsed - pulses, PULSE_TAIL_MS);
        }
        let pos = elapsed % (2 * PULSE_HALF_MS);
        if pos < PULSE_HALF_MS {
            ramp(self.base_brightness, 255, pos, PULSE_HALF_MS)
        } else {
            ramp(255, self.base_brightness, pos - PULSE_HALF_MS, PULSE_HALF_MS)
        }
    }

    fn rainbow_frame(&self, elapsed: u64, pixels: &mut [Rgb]) {
        // Locate the cycle and its step (0..=254); hold the last frame.
        let mut remaining = elapsed;
        let mut step = 254;
        for cycle in RAINBOW_CYCLES_MS {
            if remaining < cycle {
                step = remaining * 255 / cycle;
                break;
            }
            remaining -= cycle;
        }
        let n = pixels.len().max(1);
        for (i, px) in pixels.iter_mut().enumerate() {
            let idx = (i * 256 / n) as u64 + step;
            *px = scale(wheel((idx & 0xFF) as u8), self.base_brightness);
        }
    }
}

/// Colour wheel: r → g → b → back to r over 0..=255.
pub fn wheel(pos: u8) -> Rgb {
    match pos {
        0..=84 => (255 - pos * 3, pos * 3, 0),
        85..=169 => {
            let p = pos - 85;
            (0, 255 - p * 3, p * 3)
        }
        _ => {
            let p = pos - 170;
            (p * 3, 0, 255 - p * 3)
        }
    }
}

/// Linear interpolation from `from` to `to` over `duration` ms.
fn ramp(from: u8, to: u8, elapsed: u64, duration: u64) -> u8 {
    if duration == 0 || elapsed >= duration {
        return to;
    }
    let from = i64::from(from);
    let to = i64::from(to);
    let t = elapsed as i64;
    (from + (to - from) * t / duration as i64) as u8
}

/// Scale a colour by a 0–255 brightness.
pub fn scale(colour: Rgb, brightness: u8) -> Rgb {
    let (r, g, b) = colour;
    let br = brightness as u16;
    (
        ((r as u16 * br) / 255) as u8,
        ((g as u16 * br) / 255) as u8,
        ((b as u16 * br) / 255) as u8,
    )
}

// ── Well-known colour constants ───────────────────────────────

pub const BLACK: Rgb = (0, 0, 0);
pub const RED: Rgb = (255, 0, 0);
pub const GREEN: Rgb = (0, 255, 0);
pub const JADE: Rgb = (0, 255, 40);
pub const MAGENTA: Rgb = (255, 0, 20);
pub const AMBER: Rgb = (255, 100, 0);
pub const CYAN: Rgb = (0, 255, 255);
/// Neutral "light on" colour for the remote light feed.
pub const SOFTWHITE: Rgb = (255, 100, 0);
