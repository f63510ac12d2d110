//! LED strip feedback adapter.
//!
//! Bridges [`FeedbackSink`] onto the [`EffectEngine`] and the physical
//! [`PixelStrip`].  Requests only switch the effect; frames are produced
//! in [`FeedbackSink::service`], which the scheduler calls every tick and
//! during every interruptible sleep.

use crate::app::ports::FeedbackSink;
use crate::drivers::led_patterns::{Effect, EffectEngine, Rgb};
use crate::drivers::pixel_strip::PixelStrip;

pub struct StripFeedback {
    engine: EffectEngine,
    strip: PixelStrip,
}

impl StripFeedback {
    pub fn new(strip: PixelStrip, base_brightness: u8) -> Self {
        Self {
            engine: EffectEngine::new(base_brightness),
            strip,
        }
    }

    pub fn effect(&self) -> Effect {
        self.engine.effect()
    }

    pub fn strip(&self) -> &PixelStrip {
        &self.strip
    }
}

impl FeedbackSink for StripFeedback {
    fn render_solid(&mut self, colour: Rgb) {
        self.engine.set(Effect::Solid(colour));
    }

    fn fade_in(&mut self, colour: Rgb) {
        self.engine.set(Effect::FadeIn(colour));
    }

    fn fade_out(&mut self) {
        self.engine.set(Effect::FadeOut);
    }

    fn render_rainbow_sequence(&mut self) {
        self.engine.set(Effect::Rainbow);
    }

    fn confirm_selection(&mut self) {
        self.engine.set(Effect::SelectionPulse);
    }

    fn service(&mut self, now_ms: u64) {
        self.engine.render(now_ms, self.strip.pixels_mut());
        self.strip.show();
    }
}
