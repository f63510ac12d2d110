//! Node configuration parameters
//!
//! All tunable parameters for a LightLink node.  Values come from a JSON
//! document (host: file named by `LIGHTLINK_CONFIG`, device: embedded at
//! build time); every field has a default so partial documents work.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rounding convention for the Celsius → Fahrenheit telemetry value.
///
/// The two conventions only diverge on exact `.5` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Banker's rounding: `70.5 → 70`, `71.5 → 72`.
    #[default]
    HalfEven,
    /// Schoolbook rounding: `70.5 → 71`.
    HalfAwayFromZero,
}

/// Pub/sub broker connection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// API key / password.
    pub key: String,
    /// MQTT client id; derived from the node name when empty.
    pub client_id: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::from("io.adafruit.com"),
            port: 1883,
            username: String::new(),
            key: String::new(),
            client_id: String::new(),
        }
    }
}

/// WiFi station credentials (device build only).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

/// Bounded retry policy for the link recovery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Reset/reconnect attempts per recovery cycle.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt.
    pub initial_backoff_ms: u32,
    /// Upper bound on the retry delay.
    pub max_backoff_ms: u32,
    /// After a cycle gives up, the node runs offline and makes one
    /// reconnect attempt this often.
    pub offline_retry_ms: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
            offline_retry_ms: 60_000,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Pairing ---
    /// Prefix of every feed this node publishes.
    pub node_name: String,
    /// Prefix of every feed this node subscribes to.
    pub peer_name: String,

    // --- Link ---
    pub broker: BrokerConfig,
    pub wifi: WifiConfig,
    pub recovery: RecoveryConfig,

    // --- Light change detection ---
    /// Deviation from the recent average (raw units) that opens a window
    pub light_change_threshold: u16,
    /// Quiet time after the last deviation before the window closes (ms)
    pub light_hold_ms: u32,

    // --- Gestures ---
    /// Quiet time after the last gesture before the episode finalizes (ms)
    pub gesture_timeout_ms: u32,
    /// Delay between sensor polls inside the gesture capture loop (ms)
    pub gesture_poll_interval_ms: u32,

    // --- Timing ---
    /// Telemetry report interval (ms)
    pub telemetry_interval_ms: u32,
    /// Minimum spacing between inbound queue services (ms)
    pub pump_interval_ms: u32,
    /// Sleep at the end of every tick (ms)
    pub tick_interval_ms: u32,

    // --- Telemetry ---
    pub fahrenheit_rounding: RoundingMode,

    // --- LED strip ---
    pub pixel_count: u16,
    /// Resting brightness (0-255).
    pub base_brightness: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: String::from("local"),
            peer_name: String::from("remote"),

            broker: BrokerConfig::default(),
            wifi: WifiConfig::default(),
            recovery: RecoveryConfig::default(),

            light_change_threshold: 1500,
            light_hold_ms: 20_000,

            gesture_timeout_ms: 5_000,
            gesture_poll_interval_ms: 10,

            telemetry_interval_ms: 30_000,
            pump_interval_ms: 1_000,
            tick_interval_ms: 10,

            fahrenheit_rounding: RoundingMode::HalfEven,

            pixel_count: 30,
            base_brightness: 77, // ~0.3
        }
    }
}

fn is_valid_feed_prefix(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

impl NodeConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_feed_prefix(&self.node_name) {
            return Err(ConfigError::ValidationFailed(
                "node_name must be 1-32 chars of [a-z0-9-]",
            ));
        }
        if !is_valid_feed_prefix(&self.peer_name) {
            return Err(ConfigError::ValidationFailed(
                "peer_name must be 1-32 chars of [a-z0-9-]",
            ));
        }
        if self.node_name == self.peer_name {
            return Err(ConfigError::ValidationFailed(
                "node_name and peer_name must differ",
            ));
        }
        if self.broker.host.is_empty() || self.broker.port == 0 {
            return Err(ConfigError::ValidationFailed("broker host/port missing"));
        }
        if self.light_change_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "light_change_threshold must be > 0",
            ));
        }
        if self.tick_interval_ms == 0
            || self.pump_interval_ms == 0
            || self.telemetry_interval_ms == 0
            || self.gesture_poll_interval_ms == 0
        {
            return Err(ConfigError::ValidationFailed("intervals must be > 0"));
        }
        if self.light_hold_ms <= self.tick_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "light_hold_ms must exceed tick_interval_ms",
            ));
        }
        if self.gesture_timeout_ms <= self.gesture_poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "gesture_timeout_ms must exceed gesture_poll_interval_ms",
            ));
        }
        if self.recovery.max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "recovery.max_attempts must be > 0",
            ));
        }
        if self.recovery.initial_backoff_ms > self.recovery.max_backoff_ms {
            return Err(ConfigError::ValidationFailed(
                "recovery.initial_backoff_ms exceeds max_backoff_ms",
            ));
        }
        if self.recovery.offline_retry_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "recovery.offline_retry_ms must be > 0",
            ));
        }
        if self.pixel_count == 0 {
            return Err(ConfigError::ValidationFailed("pixel_count must be > 0"));
        }
        Ok(())
    }

    /// MQTT client id actually used for the session.
    pub fn client_id(&self) -> String {
        if self.broker.client_id.is_empty() {
            format!("lightlink-{}", self.node_name)
        } else {
            self.broker.client_id.clone()
        }
    }
}
