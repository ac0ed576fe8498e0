//! Constants for BreathGuard Core
//!
//! Centralized defaults for the telemetry pipeline. Every value here is an
//! externally supplied default: deployments override them through the config
//! structs, nothing in the pipeline derives them.
//!
//! ## Organization
//!
//! - **Time**: debounce, reset window, publish cadence, reconnect delay
//! - **Device**: identity limits, firmware version, topics and broker defaults
//! - **Sensors**: physical limits used to reject impossible readings

/// Time-related constants for windows, cadences and retry delays.
pub mod time;

/// Device identity, wire format and broker defaults.
pub mod device;

/// Physical limits for the environmental sensors.
pub mod sensors;

pub use time::{
    DEBOUNCE_WINDOW_MS, MS_PER_HOUR, MS_PER_SECOND, NETWORK_TIMEOUT_MS, PUBLISH_INTERVAL_MS,
    RECONNECT_DELAY_MS, RESET_WINDOW_MS,
};

pub use device::{
    DEFAULT_CLIENT_ID, DEFAULT_COHORT, DEFAULT_DEVICE_ID, DEFAULT_FIRMWARE_VERSION,
    DEFAULT_MQTT_HOST, DEFAULT_MQTT_PORT, MAX_DEVICE_ID_LEN, MAX_KEY_LEN, PAYLOAD_CAPACITY,
    SIGNATURE_HEX_LEN,
};
