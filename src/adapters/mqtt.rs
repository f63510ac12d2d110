//! MQTT transport adapter (Adafruit IO style broker).
//!
//! Implements [`TransportPort`].  Feed keys are mapped onto
//! `<username>/feeds/<key>` topics; inbound topics are handed to the
//! scheduler unchanged and classified by the router.  Everything is QoS 0:
//! lost messages heal through periodic re-publication.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with an event callback that
//!   forwards into a channel; `pump()` drains the channel.
//! - **all other targets**: `rumqttc` sync client; `pump()` drives its
//!   event loop for a few milliseconds.

use log::{debug, info, warn};

use super::wifi::WifiAdapter;
use crate::app::ports::{InboundMessage, TransportPort};
use crate::config::NodeConfig;
use crate::error::LinkError;
use crate::feeds::topic_for;

/// Upper bound on messages taken per pump so one call stays short.
const MAX_EVENTS_PER_PUMP: usize = 64;
/// Total time `reconnect_session()` waits for the broker to accept.
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;
const KEEP_ALIVE_SECS: u64 = 60;

const _: () = assert!(CONNECT_TIMEOUT_MS < crate::drivers::watchdog::WATCHDOG_TIMEOUT_MS as u64);

/// MQTT forbids wildcards and NUL in publish topics.
fn is_publishable(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#', '\0'])
}

#[cfg(not(target_os = "espidf"))]
mod session {
    use std::time::{Duration, Instant};

    use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS, RecvTimeoutError};

    use super::{CONNECT_TIMEOUT_MS, KEEP_ALIVE_SECS, MAX_EVENTS_PER_PUMP};
    use crate::app::ports::InboundMessage;
    use crate::config::BrokerConfig;
    use crate::error::LinkError;

    /// How long one pump keeps polling the event loop.
    const POLL_WINDOW: Duration = Duration::from_millis(5);
    const REQUEST_CAPACITY: usize = 64;

    pub struct Session {
        client: Client,
        connection: Connection,
        alive: bool,
    }

    impl Session {
        pub fn open(
            broker: &BrokerConfig,
            client_id: &str,
            keep_alive: &mut dyn FnMut(),
        ) -> Result<Self, LinkError> {
            let mut options = MqttOptions::new(client_id, &broker.host, broker.port);
            options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
            if !broker.username.is_empty() {
                options.set_credentials(&broker.username, &broker.key);
            }
            let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);

            let deadline = Instant::now() + Duration::from_millis(CONNECT_TIMEOUT_MS);
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(LinkError::ConnectFailed);
                }
                // One wait per event: a timed-out poll restarts the handshake.
                match connection.recv_timeout(left) {
                    Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => break,
                    Ok(Ok(_)) => keep_alive(),
                    Ok(Err(e)) => {
                        log::warn!("MQTT: connect failed: {}", e);
                        return Err(LinkError::ConnectFailed);
                    }
                    Err(_) => {
                        log::warn!("MQTT: no CONNACK within {} ms", CONNECT_TIMEOUT_MS);
                        return Err(LinkError::ConnectFailed);
                    }
                }
            }
            Ok(Self {
                client,
                connection,
                alive: true,
            })
        }

        pub fn is_alive(&self) -> bool {
            self.alive
        }

        pub fn publish(&mut self, topic: &str, value: &str) -> Result<(), LinkError> {
            self.client
                .try_publish(topic, QoS::AtMostOnce, false, value.as_bytes().to_vec())
                .map_err(|_| LinkError::QueueFull)
        }

        pub fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
            self.client
                .try_subscribe(topic, QoS::AtMostOnce)
                .map_err(|_| LinkError::SubscribeFailed)
        }

        pub fn pump(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
            let mut out = Vec::new();
            let deadline = Instant::now() + POLL_WINDOW;
            while out.len() < MAX_EVENTS_PER_PUMP {
                let left = deadline.saturating_duration_since(Instant::now());
                match self.connection.recv_timeout(left) {
                    Ok(Ok(Event::Incoming(Packet::Publish(p)))) => {
                        match String::from_utf8(p.payload.to_vec()) {
                            Ok(payload) => out.push(InboundMessage::new(p.topic, payload)),
                            Err(_) => log::warn!("MQTT: non UTF-8 payload on {}", p.topic),
                        }
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        log::warn!("MQTT: connection error: {}", e);
                        self.alive = false;
                        return Err(LinkError::ConnectionLost);
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => {
                        self.alive = false;
                        return Err(LinkError::ConnectionLost);
                    }
                }
            }
            Ok(out)
        }
    }
}

#[cfg(target_os = "espidf")]
mod session {
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
    use std::time::{Duration, Instant};

    use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

    use super::{CONNECT_TIMEOUT_MS, KEEP_ALIVE_SECS, MAX_EVENTS_PER_PUMP};
    use crate::app::ports::InboundMessage;
    use crate::config::BrokerConfig;
    use crate::error::LinkError;

    /// The connect wait is sliced so `keep_alive` runs at least this often.
    const CONNECT_SLICE: Duration = Duration::from_millis(500);

    enum Inbound {
        Connected,
        Disconnected,
        Message(InboundMessage),
    }

    pub struct Session {
        client: EspMqttClient<'static>,
        rx: Receiver<Inbound>,
        alive: bool,
    }

    impl Session {
        pub fn open(
            broker: &BrokerConfig,
            client_id: &str,
            keep_alive: &mut dyn FnMut(),
        ) -> Result<Self, LinkError> {
            let url = format!("mqtt://{}:{}", broker.host, broker.port);
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                username: (!broker.username.is_empty()).then_some(broker.username.as_str()),
                password: (!broker.key.is_empty()).then_some(broker.key.as_str()),
                keep_alive_interval: Some(Duration::from_secs(KEEP_ALIVE_SECS)),
                ..Default::default()
            };

            let (tx, rx) = mpsc::channel();
            let client = EspMqttClient::new_cb(&url, &conf, move |event| {
                let msg = match event.payload() {
                    EventPayload::Connected(_) => Inbound::Connected,
                    EventPayload::Disconnected => Inbound::Disconnected,
                    EventPayload::Received { topic, data, .. } => {
                        match (topic, core::str::from_utf8(data)) {
                            (Some(t), Ok(p)) => Inbound::Message(InboundMessage::new(t, p)),
                            _ => return,
                        }
                    }
                    _ => return,
                };
                // The receiver only disappears with the session itself.
                let _ = tx.send(msg);
            })
            .map_err(|e| {
                log::warn!("MQTT(espidf): client init failed: {}", e);
                LinkError::ConnectFailed
            })?;

            let deadline = Instant::now() + Duration::from_millis(CONNECT_TIMEOUT_MS);
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    log::warn!("MQTT(espidf): no CONNACK within {} ms", CONNECT_TIMEOUT_MS);
                    return Err(LinkError::ConnectFailed);
                }
                match rx.recv_timeout(left.min(CONNECT_SLICE)) {
                    Ok(Inbound::Connected) => break,
                    Ok(Inbound::Disconnected) => {
                        log::warn!("MQTT(espidf): broker dropped the connection");
                        return Err(LinkError::ConnectFailed);
                    }
                    Ok(Inbound::Message(_)) | Err(RecvTimeoutError::Timeout) => keep_alive(),
                    Err(RecvTimeoutError::Disconnected) => return Err(LinkError::ConnectFailed),
                }
            }
            Ok(Self {
                client,
                rx,
                alive: true,
            })
        }

        pub fn is_alive(&self) -> bool {
            self.alive
        }

        pub fn publish(&mut self, topic: &str, value: &str) -> Result<(), LinkError> {
            self.client
                .enqueue(topic, QoS::AtMostOnce, false, value.as_bytes())
                .map(|_| ())
                .map_err(|e| {
                    log::warn!("MQTT(espidf): publish to {} rejected: {}", topic, e);
                    LinkError::PublishFailed
                })
        }

        pub fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
            self.client
                .subscribe(topic, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|_| LinkError::SubscribeFailed)
        }

        pub fn pump(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
            let mut out = Vec::new();
            while out.len() < MAX_EVENTS_PER_PUMP {
                match self.rx.try_recv() {
                    Ok(Inbound::Message(m)) => out.push(m),
                    Ok(Inbound::Connected) => self.alive = true,
                    Ok(Inbound::Disconnected) => {
                        self.alive = false;
                        return Err(LinkError::ConnectionLost);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.alive = false;
                        return Err(LinkError::ConnectionLost);
                    }
                }
            }
            Ok(out)
        }
    }
}

use session::Session;

/// Broker session plus the WiFi link it rides on.
pub struct MqttTransport {
    wifi: WifiAdapter,
    broker: crate::config::BrokerConfig,
    client_id: String,
    session: Option<Session>,
}

impl MqttTransport {
    pub fn new(config: &NodeConfig, wifi: WifiAdapter) -> Self {
        Self {
            wifi,
            broker: config.broker.clone(),
            client_id: config.client_id(),
            session: None,
        }
    }

    pub fn wifi(&self) -> &WifiAdapter {
        &self.wifi
    }

    fn topic(&self, feed: &str) -> String {
        topic_for(&self.broker.username, feed)
    }

    fn live_session(&mut self) -> Result<&mut Session, LinkError> {
        match self.session.as_mut() {
            Some(s) if s.is_alive() => Ok(s),
            _ => Err(LinkError::NotConnected),
        }
    }
}

impl TransportPort for MqttTransport {
    fn pump(&mut self) -> Result<Vec<InboundMessage>, LinkError> {
        let messages = self.live_session()?.pump()?;
        for m in &messages {
            debug!("MQTT: {} = {:?}", m.feed_name, m.payload);
        }
        Ok(messages)
    }

    fn publish(&mut self, feed: &str, value: &str) -> Result<(), LinkError> {
        let topic = self.topic(feed);
        if !is_publishable(&topic) {
            warn!("MQTT: refusing to publish to {:?}", topic);
            return Err(LinkError::PublishFailed);
        }
        self.live_session()?.publish(&topic, value)
    }

    fn subscribe(&mut self, feed: &str) -> Result<(), LinkError> {
        let topic = self.topic(feed);
        self.live_session()?.subscribe(&topic)?;
        info!("MQTT: subscribed to {}", topic);
        Ok(())
    }

    fn reset_link(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), LinkError> {
        self.session = None;
        self.wifi.reset(keep_alive).map_err(|e| {
            warn!("MQTT: link reset failed: {}", e);
            LinkError::ResetFailed
        })
    }

    fn reconnect_session(&mut self, keep_alive: &mut dyn FnMut()) -> Result<(), LinkError> {
        self.session = None;
        if !self.wifi.is_connected() {
            self.wifi
                .connect(keep_alive)
                .map_err(|_| LinkError::ConnectFailed)?;
        }
        info!(
            "MQTT: connecting to {}:{} as {}",
            self.broker.host, self.broker.port, self.client_id
        );
        self.session = Some(Session::open(&self.broker, &self.client_id, keep_alive)?);
        info!("MQTT: session up");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_alive())
    }
}
