//! Node configuration
//!
//! A node is configured from one JSON file. Every field has a default
//! matching the core constants except the two keys, which must be provided
//! (in the file or through `BREATHGUARD_COMMUNITY_KEY` /
//! `BREATHGUARD_DEVICE_KEY`).
//!
//! ```json
//! {
//!   "device": {
//!     "device_id": "houston_ej_ai_001",
//!     "cohort": "ej_ai",
//!     "community_key": "hex:6a8f...",
//!     "device_key": "per-device secret"
//!   },
//!   "mqtt": { "host": "broker.local", "port": 1883, "qos": 1 },
//!   "timing": { "publish_interval_ms": 30000 }
//! }
//! ```
//!
//! Keys are taken as raw UTF-8 bytes unless prefixed with `hex:`. Setting
//! `device.key_length` pins both keys to exactly that many bytes; signatures
//! hash the two keys back to back, so mixed lengths would let different key
//! pairs sign alike.

use std::fmt;
use std::path::{Path, PathBuf};

use breathguard_core::constants::{
    DEBOUNCE_WINDOW_MS, DEFAULT_CLIENT_ID, DEFAULT_COHORT, DEFAULT_DEVICE_ID,
    DEFAULT_FIRMWARE_VERSION, DEFAULT_MQTT_HOST, DEFAULT_MQTT_PORT, MAX_KEY_LEN,
    NETWORK_TIMEOUT_MS, PUBLISH_INTERVAL_MS, RECONNECT_DELAY_MS, RESET_WINDOW_MS,
};
use breathguard_core::{
    topic_for_cohort, DeviceId, DeviceIdentity, HealthConfig, RetryPolicy, SchedulerConfig,
    SecretKey, Topic,
};
use serde::Deserialize;
use thiserror::Error;

use crate::json::JsonEncoder;

/// Environment variable overriding `device.community_key`
pub const COMMUNITY_KEY_ENV: &str = "BREATHGUARD_COMMUNITY_KEY";
/// Environment variable overriding `device.device_key`
pub const DEVICE_KEY_ENV: &str = "BREATHGUARD_DEVICE_KEY";

const HEX_PREFIX: &str = "hex:";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Key text as written in the configuration; never printed
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve to key bytes (`hex:` prefix decodes hex)
    pub fn to_secret(&self, field: &'static str) -> Result<SecretKey, ConfigError> {
        let key = match self.0.strip_prefix(HEX_PREFIX) {
            Some(digits) => {
                let bytes = hex::decode(digits).map_err(|e| ConfigError::invalid(field, e))?;
                SecretKey::new(&bytes)
            }
            None => SecretKey::new(self.0.as_bytes()),
        };
        key.map_err(|e| ConfigError::invalid(field, e))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("KeyMaterial(<unset>)")
        } else {
            f.write_str("KeyMaterial(<redacted>)")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub device_id: String,
    pub cohort: String,
    pub firmware_version: String,
    pub community_key: KeyMaterial,
    pub device_key: KeyMaterial,
    /// Required byte length of both keys; any length when absent
    pub key_length: Option<usize>,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            cohort: DEFAULT_COHORT.to_string(),
            firmware_version: DEFAULT_FIRMWARE_VERSION.to_string(),
            community_key: KeyMaterial::default(),
            device_key: KeyMaterial::default(),
            key_length: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MqttSection {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub timeout_ms: u64,
    /// 0, 1 or 2
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_MQTT_HOST.to_string(),
            port: DEFAULT_MQTT_PORT,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            keep_alive_secs: 30,
            timeout_ms: NETWORK_TIMEOUT_MS,
            qos: 1,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSection {
    pub debounce_ms: u64,
    pub reset_window_ms: u64,
    pub publish_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    /// Unbounded when absent
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_WINDOW_MS,
            reset_window_ms: RESET_WINDOW_MS,
            publish_interval_ms: PUBLISH_INTERVAL_MS,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            max_reconnect_attempts: None,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub device: DeviceSection,
    pub mqtt: MqttSection,
    pub timing: TimingSection,
}

impl NodeConfig {
    /// Parse without validating; keys may still come from the environment
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse and validate
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, apply key overrides from the environment, validate
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?.with_env_keys();
        config.validate()?;
        Ok(config)
    }

    /// Replace keys with `BREATHGUARD_*_KEY` variables when set
    pub fn with_env_keys(mut self) -> Self {
        if let Ok(key) = std::env::var(COMMUNITY_KEY_ENV) {
            self.device.community_key = KeyMaterial::new(key);
        }
        if let Ok(key) = std::env::var(DEVICE_KEY_ENV) {
            self.device.device_key = KeyMaterial::new(key);
        }
        self
    }

    /// Point the node at `host:port`
    pub fn set_broker(&mut self, broker: &str) -> Result<(), ConfigError> {
        let (host, port) = parse_broker(broker)?;
        self.mqtt.host = host;
        self.mqtt.port = port;
        Ok(())
    }

    /// Check every section; the first problem found is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity()?;
        self.topic()?;

        if self.device.firmware_version.is_empty() {
            return Err(ConfigError::invalid("device.firmware_version", "must not be empty"));
        }

        let mqtt = &self.mqtt;
        if mqtt.host.is_empty() {
            return Err(ConfigError::invalid("mqtt.host", "must not be empty"));
        }
        if mqtt.port == 0 {
            return Err(ConfigError::invalid("mqtt.port", "must not be 0"));
        }
        if mqtt.client_id.is_empty() {
            return Err(ConfigError::invalid("mqtt.client_id", "must not be empty"));
        }
        if mqtt.timeout_ms == 0 {
            return Err(ConfigError::invalid("mqtt.timeout_ms", "must be positive"));
        }
        if mqtt.qos > 2 {
            return Err(ConfigError::invalid("mqtt.qos", format!("{} is not 0, 1 or 2", mqtt.qos)));
        }
        if mqtt.username.is_some() != mqtt.password.is_some() {
            return Err(ConfigError::invalid("mqtt.username", "username and password go together"));
        }

        let timing = &self.timing;
        if timing.publish_interval_ms == 0 {
            return Err(ConfigError::invalid("timing.publish_interval_ms", "must be positive"));
        }
        if timing.reconnect_delay_ms == 0 {
            return Err(ConfigError::invalid("timing.reconnect_delay_ms", "must be positive"));
        }
        if timing.reset_window_ms <= timing.debounce_ms {
            return Err(ConfigError::invalid(
                "timing.reset_window_ms",
                "must be longer than the debounce window",
            ));
        }
        if timing.max_reconnect_attempts == Some(0) {
            return Err(ConfigError::invalid("timing.max_reconnect_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Build the device identity from the configured keys
    pub fn identity(&self) -> Result<DeviceIdentity, ConfigError> {
        let device = &self.device;
        if device.community_key.is_empty() {
            return Err(ConfigError::invalid(
                "device.community_key",
                format!("not set (config or {})", COMMUNITY_KEY_ENV),
            ));
        }
        if device.device_key.is_empty() {
            return Err(ConfigError::invalid(
                "device.device_key",
                format!("not set (config or {})", DEVICE_KEY_ENV),
            ));
        }

        let community_key = device.community_key.to_secret("device.community_key")?;
        let device_key = device.device_key.to_secret("device.device_key")?;
        if let Some(expected) = device.key_length {
            if expected == 0 || expected > MAX_KEY_LEN {
                return Err(ConfigError::invalid(
                    "device.key_length",
                    format!("{} is outside 1..={}", expected, MAX_KEY_LEN),
                ));
            }
            for (field, key) in [
                ("device.community_key", &community_key),
                ("device.device_key", &device_key),
            ] {
                if key.len() != expected {
                    return Err(ConfigError::invalid(
                        field,
                        format!("{} bytes, expected {}", key.len(), expected),
                    ));
                }
            }
        }
        let device_id = DeviceId::new(&device.device_id)
            .map_err(|e| ConfigError::invalid("device.device_id", e))?;

        Ok(DeviceIdentity::new(community_key, device_key, device_id))
    }

    pub fn topic(&self) -> Result<Topic, ConfigError> {
        topic_for_cohort(&self.device.cohort).map_err(|e| ConfigError::invalid("device.cohort", e))
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig::new(self.timing.debounce_ms, self.timing.reset_window_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::fixed(self.timing.reconnect_delay_ms);
        match self.timing.max_reconnect_attempts {
            Some(max) => policy.max_attempts(max),
            None => policy,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.timing.publish_interval_ms)
    }

    pub fn encoder(&self) -> JsonEncoder {
        JsonEncoder::new(self.device.firmware_version.clone())
    }

    #[cfg(feature = "mqtt")]
    pub fn mqtt_config(&self) -> crate::mqtt::MqttConfig {
        let mqtt = &self.mqtt;
        let qos = crate::mqtt::qos_from_level(mqtt.qos).unwrap_or(crate::mqtt::QoS::AtLeastOnce);
        let config = crate::mqtt::MqttConfig::new(mqtt.host.clone(), mqtt.port)
            .client_id(mqtt.client_id.clone())
            .keep_alive_secs(mqtt.keep_alive_secs)
            .timeout_ms(mqtt.timeout_ms)
            .qos(qos);

        match (&mqtt.username, &mqtt.password) {
            (Some(user), Some(pass)) => config.credentials(user.clone(), pass.clone()),
            _ => config,
        }
    }
}

/// Split `host:port`; a bare host gets the default port
pub fn parse_broker(broker: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = match broker.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|e| {
                ConfigError::invalid("broker", format!("bad port {:?}: {}", port, e))
            })?;
            (host, port)
        }
        None => (broker, DEFAULT_MQTT_PORT),
    };

    if host.is_empty() {
        return Err(ConfigError::invalid("broker", "missing host"));
    }
    if port == 0 {
        return Err(ConfigError::invalid("broker", "port must not be 0"));
    }
    Ok((host.to_string(), port))
}
