//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements     | Connects to                   |
//! |------------------|----------------|-------------------------------|
//! | `log_sink`       | EventSink      | Serial log output             |
//! | `mqtt`           | TransportPort  | MQTT broker (Adafruit IO)     |
//! | `strip_feedback` | FeedbackSink   | WS2812 strip via RMT          |
//! | `time`           | Clock          | ESP32 system timer            |
//! | `wifi`           | (used by mqtt) | ESP-IDF WiFi STA              |

pub mod log_sink;
pub mod mqtt;
pub mod strip_feedback;
pub mod time;
pub mod wifi;
