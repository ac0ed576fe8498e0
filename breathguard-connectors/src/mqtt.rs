//! MQTT channel for BreathGuard
//!
//! A blocking [`PublishChannel`] over `rumqttc`'s synchronous client. The
//! event loop is driven inline: `connect` pumps it until CONNACK, `send`
//! pumps it until the publish is on the wire (QoS 0) or acknowledged
//! (QoS 1/2). Nothing runs in the background between calls, which matches
//! the node's single cooperative main loop.

use std::time::{Duration, Instant};

use breathguard_core::constants::device::{DEFAULT_CLIENT_ID, DEFAULT_MQTT_HOST, DEFAULT_MQTT_PORT};
use breathguard_core::constants::NETWORK_TIMEOUT_MS;
use breathguard_core::PublishChannel;
use log::{debug, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, RecvTimeoutError,
};
use thiserror::Error;

pub use rumqttc::QoS;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Not connected")]
    NotConnected,

    /// Broker did not answer within the configured timeout
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// CONNACK with a non-success return code
    #[error("Connection refused: {0:?}")]
    Refused(ConnectReturnCode),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Client error: {0}")]
    Client(String),
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// How long to wait for CONNACK / PUBACK
    pub timeout: Duration,
    pub qos: QoS,
    pub credentials: Option<(String, String)>,
    /// Request channel capacity of the client
    pub capacity: usize,
}

impl MqttConfig {
    /// Create new configuration for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            keep_alive: Duration::from_secs(30),
            timeout: Duration::from_millis(NETWORK_TIMEOUT_MS),
            qos: QoS::AtLeastOnce,
            credentials: None,
            capacity: 10,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set username/password authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user.clone(), pass.clone());
        }
        options
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MQTT_HOST, DEFAULT_MQTT_PORT)
    }
}

/// Map a numeric QoS level (0, 1, 2)
pub fn qos_from_level(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

struct Session {
    client: Client,
    connection: Connection,
}

/// Blocking MQTT publish channel
pub struct MqttChannel {
    config: MqttConfig,
    session: Option<Session>,
}

impl MqttChannel {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Send DISCONNECT and drop the session
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.client.disconnect().is_ok() {
                // Flush the DISCONNECT packet; errors here are expected
                let _ = session.connection.recv_timeout(self.config.timeout);
            }
            info!("disconnected from {}:{}", self.config.host, self.config.port);
        }
    }

    fn wait_for<F>(&mut self, mut done: F) -> Result<(), MqttError>
    where
        F: FnMut(&Event) -> Result<bool, MqttError>,
    {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        let session = self.session.as_mut().ok_or(MqttError::NotConnected)?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MqttError::Timeout(timeout));
            }

            match session.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => {
                    debug!("mqtt event: {:?}", event);
                    if done(&event)? {
                        return Ok(());
                    }
                }
                Ok(Err(e)) => return Err(MqttError::Connection(e.to_string())),
                Err(RecvTimeoutError::Timeout) => return Err(MqttError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(MqttError::Connection("event loop closed".to_string()))
                }
            }
        }
    }
}

impl PublishChannel for MqttChannel {
    type Error = MqttError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        // A fresh session per attempt: rumqttc would otherwise reconnect on
        // its own the next time the event loop is polled.
        self.session = None;
        let (client, connection) = Client::new(self.config.options(), self.config.capacity);
        self.session = Some(Session { client, connection });

        let result = self.wait_for(|event| match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                Ok(true)
            }
            Event::Incoming(Packet::ConnAck(ack)) => Err(MqttError::Refused(ack.code)),
            _ => Ok(false),
        });

        match result {
            Ok(()) => {
                info!(
                    "connected to {}:{} as {}",
                    self.config.host, self.config.port, self.config.client_id
                );
                Ok(())
            }
            Err(e) => {
                self.session = None;
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        let qos = self.config.qos;
        let session = self.session.as_mut().ok_or(MqttError::NotConnected)?;

        if let Err(e) = session.client.publish(topic, qos, false, data.to_vec()) {
            self.session = None;
            return Err(MqttError::Client(e.to_string()));
        }

        let result = self.wait_for(|event| {
            Ok(match (qos, event) {
                (QoS::AtMostOnce, Event::Outgoing(Outgoing::Publish(_))) => true,
                (QoS::AtLeastOnce, Event::Incoming(Packet::PubAck(_))) => true,
                (QoS::ExactlyOnce, Event::Incoming(Packet::PubComp(_))) => true,
                _ => false,
            })
        });

        if let Err(e) = &result {
            warn!("publish to {} failed: {}", topic, e);
            self.session = None;
        }
        result
    }
}

impl Drop for MqttChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}
