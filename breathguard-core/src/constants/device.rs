//! Device Identity and Wire Constants

// ===== IDENTITY LIMITS =====

/// Maximum secret key length in bytes.
///
/// Matches the 64-byte key slots of the secure key store.
pub const MAX_KEY_LEN: usize = 64;

/// Maximum device identifier length in bytes.
///
/// 31 characters plus the terminator of the firmware's 32-byte field.
pub const MAX_DEVICE_ID_LEN: usize = 31;

// ===== SIGNATURE =====

/// SHA-256 digest size in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hex-encoded signature length (two characters per digest byte).
pub const SIGNATURE_HEX_LEN: usize = DIGEST_LEN * 2;

// ===== CANONICAL PAYLOAD =====

/// Tag prefixed to every canonical payload.
///
/// Changing the payload layout requires a new tag; old records keep
/// verifying under the old one.
pub const PAYLOAD_TAG: &[u8; 4] = b"BGv1";

/// Canonical payload capacity in bytes.
///
/// tag(4) + 4 x f32(16) + u64(8) + u8(1) + id length(1) + id(31) = 61
pub const PAYLOAD_CAPACITY: usize = 64;

// ===== FIRMWARE & BROKER DEFAULTS =====

/// Version string carried in every published record.
pub const DEFAULT_FIRMWARE_VERSION: &str = "2.0-ej-ai";

/// Cohort name used to build the publish topic.
pub const DEFAULT_COHORT: &str = "ej_ai";

/// Identifier of the reference node.
pub const DEFAULT_DEVICE_ID: &str = "houston_ej_ai_001";

/// MQTT client identifier.
pub const DEFAULT_CLIENT_ID: &str = "HoustonEJAI";

/// Broker host.
pub const DEFAULT_MQTT_HOST: &str = "localhost";

/// Broker port (plain MQTT).
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Topic prefix; the full topic is `sensors/<cohort>/encrypted`.
pub const TOPIC_PREFIX: &str = "sensors";

/// Topic suffix for the signed telemetry stream.
pub const TOPIC_SUFFIX: &str = "encrypted";
