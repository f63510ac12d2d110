//! WiFi station-mode adapter: the link layer under the broker session.
//!
//! The scheduler never talks to it directly: [`MqttTransport`](super::mqtt::MqttTransport)
//! owns it and calls [`WifiAdapter::reset`] from `reset_link()`.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs; the host is assumed to be online.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

/// Upper bound on one association attempt.
pub const CONNECT_TIMEOUT_MS: u32 = 8_000;
/// Association progress is checked this often; `keep_alive` runs in between.
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 250;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(WifiError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), WifiError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    resets: u32,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: number of upcoming connects that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            resets: 0,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            resets: 0,
            sim_failures: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Number of completed [`reset`](Self::reset) calls.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), WifiError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| WifiError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| WifiError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Join the configured network, calling `keep_alive` while waiting.
    pub fn connect(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), WifiError> {
        if self.state == WifiState::Connected {
            return Ok(());
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;
        match self.platform_connect(keep_alive) {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    /// Drop the association and join again.
    pub fn reset(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), WifiError> {
        warn!("WiFi: resetting link");
        self.disconnect();
        self.connect(keep_alive)?;
        self.resets = self.resets.wrapping_add(1);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), WifiError> {
        if self.ssid.is_empty() {
            return Err(WifiError::NoCredentials);
        }
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| WifiError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(espidf): {}", e);
            WifiError::ConnectionFailed
        };
        self.wifi.set_configuration(&config).map_err(fail)?;
        if !self.wifi.is_started().map_err(fail)? {
            self.wifi.start().map_err(fail)?;
        }

        // Start the association without blocking, then wait in slices.
        self.wifi.wifi_mut().connect().map_err(fail)?;
        let mut waited = 0;
        while !self.wifi.is_up().map_err(fail)? {
            if waited >= CONNECT_TIMEOUT_MS {
                warn!("WiFi(espidf): no IP after {} ms", waited);
                return Err(WifiError::ConnectionFailed);
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
            keep_alive();
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), WifiError> {
        keep_alive();
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated association failure");
            return Err(WifiError::ConnectionFailed);
        }
        info!("WiFi(sim): host network assumed up");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi(espidf): disconnect: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Make the next `n` connects fail (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
