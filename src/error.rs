//! Unified error types for the LightLink node.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! scheduler's failure handling stays uniform: anything that escapes a
//! tick sends the loop through link recovery.  All variants are `Copy`
//! so they can be logged and carried in events without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the node funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The pub/sub transport or the radio link beneath it failed.
    Link(LinkError),
    /// A sensor could not be read.
    Sensor(SensorError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl Error {
    /// Link and sensor faults are transient and handled by the recovery
    /// path; configuration faults only occur at boot.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Link(_) | Self::Sensor(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No session is established.
    NotConnected,
    /// The broker or access point refused or timed out the connection.
    ConnectFailed,
    /// A feed subscription request could not be queued.
    SubscribeFailed,
    /// A publish request could not be queued.
    PublishFailed,
    /// The outbound request queue is full.
    QueueFull,
    /// An established session dropped.
    ConnectionLost,
    /// The radio / link layer could not be restarted.
    ResetFailed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::QueueFull => write!(f, "request queue full"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::ResetFailed => write!(f, "link reset failed"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// An I2C transaction failed.
    BusError,
    /// The device did not answer with its expected identity.
    DeviceNotFound,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::BusError => write!(f, "I2C bus error"),
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    Parse,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
