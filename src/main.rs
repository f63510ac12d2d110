//! LightLink node main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHub        MqttTransport    StripFeedback  LogEventSink │
//! │  (SensorPort)     (TransportPort)  (FeedbackSink) (EventSink)  │
//! │  ADC + I²C        WiFi + broker    WS2812 / RMT   (Clock)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          Scheduler (single-threaded loop)              │    │
//! │  │  ChangeDetector · GestureAccumulator · Telemetry       │    │
//! │  │  RemoteEventRouter                                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the host the same loop runs against a simulated bus and an in-memory
//! strip; lines on stdin drive the simulated sensors.

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use lightlink::adapters::log_sink::LogEventSink;
use lightlink::adapters::mqtt::MqttTransport;
use lightlink::adapters::strip_feedback::StripFeedback;
use lightlink::adapters::time::MonotonicClock;
use lightlink::adapters::wifi::WifiAdapter;
use lightlink::app::ports::{Clock, FeedbackSink};
use lightlink::config::NodeConfig;
use lightlink::drivers::led_patterns::{BLACK, GREEN};
use lightlink::drivers::pixel_strip::PixelStrip;
use lightlink::error::Error;
use lightlink::pins;
use lightlink::scheduler::Scheduler;
use lightlink::sensors::light::LightSensor;
use lightlink::sensors::SensorHub;

const SPLASH_MS: u32 = 1_000;

/// Show green for a moment, then go dark.
fn boot_splash(feedback: &mut StripFeedback, clock: &mut MonotonicClock) {
    feedback.render_solid(GREEN);
    feedback.service(clock.now_ms());
    clock.sleep_ms(SPLASH_MS);
    feedback.render_solid(BLACK);
    feedback.service(clock.now_ms());
}

fn banner(config: &NodeConfig) {
    info!("╔══════════════════════════════════════╗");
    info!("║  LightLink v{:<25}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!(
        "Node '{}' paired with '{}' via {}:{}",
        config.node_name, config.peer_name, config.broker.host, config.broker.port
    );
}

fn wifi_credentials(wifi: &mut WifiAdapter, config: &NodeConfig) -> Result<()> {
    if config.wifi.ssid.is_empty() {
        warn!("WiFi: no SSID configured");
        return Ok(());
    }
    wifi.set_credentials(&config.wifi.ssid, &config.wifi.password)
        .map_err(|e| anyhow::anyhow!("WiFi credentials rejected: {}", e))
}

// ── Device ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn load_config() -> Result<NodeConfig> {
    match option_env!("LIGHTLINK_CONFIG_JSON") {
        Some(json) => NodeConfig::from_json(json)
            .map_err(Error::from)
            .context("embedded configuration"),
        None => {
            warn!("No embedded configuration, using defaults");
            Ok(NodeConfig::default())
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let config = load_config()?;
    banner(&config);

    if let Err(e) = lightlink::drivers::hw_init::init_peripherals() {
        // The watchdog is not armed yet.
        log::error!("HAL init failed: {} (halting)", e);
        return Err(e.into());
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // Pin choices follow the table in `pins`.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let mut sensors = SensorHub::new(i2c, LightSensor::new(pins::LIGHT_ADC_CHANNEL));
    if let Err(e) = sensors.init() {
        warn!("Sensor init failed ({}), continuing; reads will report errors", e);
    }

    let strip = PixelStrip::new(
        peripherals.rmt.channel0,
        peripherals.pins.gpio16,
        usize::from(config.pixel_count),
    )?;
    let mut feedback = StripFeedback::new(strip, config.base_brightness);
    let mut clock = MonotonicClock::new();
    boot_splash(&mut feedback, &mut clock);

    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    wifi_credentials(&mut wifi, &config)?;
    let transport = MqttTransport::new(&config, wifi);

    let mut scheduler = Scheduler::new(
        config,
        sensors,
        transport,
        feedback,
        clock,
        LogEventSink::new(),
    );
    scheduler.run()
}

// ── Host simulator ────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn load_config() -> Result<NodeConfig> {
    match std::env::var("LIGHTLINK_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path))?;
            NodeConfig::from_json(&json)
                .map_err(Error::from)
                .with_context(|| format!("parsing {}", path))
        }
        Err(_) => {
            warn!("LIGHTLINK_CONFIG not set, using defaults");
            Ok(NodeConfig::default())
        }
    }
}

/// Read simulator commands from stdin:
/// `swipe <up|down|left|right>`, `temp <celsius>`, `light <0-65535>`.
#[cfg(not(target_os = "espidf"))]
fn spawn_console(bus: lightlink::sensors::sim_bus::SimBus) -> Result<()> {
    use lightlink::detect::gesture::Gesture;
    use lightlink::sensors::light::sim_set_light;
    use std::io::BufRead;

    std::thread::Builder::new()
        .name("sim-console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let mut words = line.split_whitespace();
                match (words.next(), words.next()) {
                    (Some("swipe"), Some(arg)) => match Gesture::from_label(arg) {
                        Some(g) => bus.swipe(g),
                        None => warn!("sim: unknown gesture '{}'", arg),
                    },
                    (Some("temp"), Some(arg)) => match arg.parse() {
                        Ok(c) => bus.set_temperature(c),
                        Err(_) => warn!("sim: bad temperature '{}'", arg),
                    },
                    (Some("light"), Some(arg)) => match arg.parse() {
                        Ok(level) => sim_set_light(level),
                        Err(_) => warn!("sim: bad light level '{}'", arg),
                    },
                    (None, _) => {}
                    _ => warn!("sim: unrecognised command '{}'", line),
                }
            }
        })
        .context("spawning console thread")?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use lightlink::sensors::sim_bus::SimBus;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    banner(&config);
    lightlink::drivers::hw_init::init_peripherals()?;

    let bus = SimBus::new();
    spawn_console(bus.clone())?;
    let mut sensors = SensorHub::new(bus, LightSensor::new(pins::LIGHT_ADC_CHANNEL));
    sensors.init().map_err(Error::from).context("sensor init")?;

    let strip = PixelStrip::new(usize::from(config.pixel_count));
    let mut feedback = StripFeedback::new(strip, config.base_brightness);
    let mut clock = MonotonicClock::new();
    boot_splash(&mut feedback, &mut clock);

    let mut wifi = WifiAdapter::new();
    wifi_credentials(&mut wifi, &config)?;
    let transport = MqttTransport::new(&config, wifi);

    let mut scheduler = Scheduler::new(
        config,
        sensors,
        transport,
        feedback,
        clock,
        LogEventSink::new(),
    );
    scheduler.run()
}
