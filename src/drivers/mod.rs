//! Strip animation, strip output, watchdog, and one-shot hardware init.

pub mod hw_init;
pub mod led_patterns;
pub mod pixel_strip;
pub mod watchdog;
