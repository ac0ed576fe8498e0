//! Broker, Encoding and Configuration Glue for BreathGuard Nodes
//!
//! ## Overview
//!
//! `breathguard-core` only talks to the outside world through traits. This
//! crate provides the host-side implementations:
//!
//! | Core trait       | Implementation               | Backing crate |
//! |------------------|------------------------------|---------------|
//! | `PublishChannel` | [`mqtt::MqttChannel`]        | `rumqttc`     |
//! | `RecordEncoder`  | [`json::JsonEncoder`]        | `serde_json`  |
//! | `SensorSource`   | [`sensors::SimulatedSensors`]| -             |
//!
//! plus [`config::NodeConfig`], the JSON node configuration, and the
//! `breathguard-node` binary that wires everything together.
//!
//! ## MQTT
//!
//! Records go to `sensors/<cohort>/encrypted` with QoS 1 by default. The
//! channel connects synchronously (waits for CONNACK) so that the core's
//! `ConnectivityManager` sees a real success or failure for every attempt.
//! There is no client-side buffering: a record that cannot be sent is
//! dropped and the next tick carries a fresh one.
//!
//! ## Wire format
//!
//! ```json
//! {"pm25":25.0,"pm10":40.0,"temperature":28.0,"humidity":55.0,
//!  "timestamp":1000,"health_events":3,"device_id":"node_001",
//!  "signature":"<64 hex chars>","encrypted":true,"version":"2.0-ej-ai"}
//! ```
//!
//! The signature covers the canonical binary payload, not this text, so
//! field order and float formatting do not matter to verification.
//!
//! ## Example Usage
//!
//! ```rust
//! use breathguard_connectors::json::{decode_record, JsonEncoder};
//! use breathguard_core::{compose, DeviceIdentity, RecordEncoder, SensorReading};
//!
//! let identity = DeviceIdentity::from_parts(b"ck1", b"dk1", "node_001")?;
//! let record = compose(SensorReading::new(25.0, 40.0, 28.0, 55.0, 1000), 3, &identity);
//!
//! let mut encoder = JsonEncoder::default();
//! let bytes = encoder.encode(&record)?.to_vec();
//!
//! let received = decode_record(&bytes)?;
//! assert!(received.record.verify(&identity).is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod json;
pub mod sensors;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use config::{ConfigError, NodeConfig};
pub use json::{decode_record, decode_verified, DecodeError, IngestedRecord, JsonEncoder};
pub use sensors::SimulatedSensors;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttChannel, MqttConfig, MqttError, QoS};

use breathguard_core::TelemetryError;
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] MqttError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}
