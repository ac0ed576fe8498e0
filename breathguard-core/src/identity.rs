//! Device identity: the two signing keys and the device identifier
//!
//! The identity is built once at startup from the secure key store and then
//! passed by reference to whatever needs it. There is no process-wide key
//! state, so tests can construct identities with synthetic keys.
//!
//! Key bytes are wiped on drop and never appear in `Debug` output.
//!
//! Keys are opaque and may be 1..=64 bytes long. Signatures hash the two keys
//! back to back with no length framing, so a deployment must keep both key
//! lengths fixed: ("ab", "c") and ("a", "bc") sign identically. The node
//! configuration enforces this with `device.key_length`.

use core::fmt;

use heapless::String;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{MAX_DEVICE_ID_LEN, MAX_KEY_LEN};
use crate::errors::{TelemetryError, TelemetryResult};

/// Opaque secret key of 1..=64 bytes
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; MAX_KEY_LEN],
    len: u8,
}

impl SecretKey {
    pub fn new(key: &[u8]) -> TelemetryResult<Self> {
        if key.is_empty() {
            return Err(TelemetryError::InvalidIdentity { reason: "empty key" });
        }
        if key.len() > MAX_KEY_LEN {
            return Err(TelemetryError::InvalidIdentity { reason: "key longer than 64 bytes" });
        }

        let mut bytes = [0u8; MAX_KEY_LEN];
        bytes[..key.len()].copy_from_slice(key);
        Ok(Self {
            bytes,
            len: key.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.len)
    }
}

/// Stable device identifier (1..=31 printable ASCII characters)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String<MAX_DEVICE_ID_LEN>);

impl DeviceId {
    pub fn new(id: &str) -> TelemetryResult<Self> {
        if id.is_empty() {
            return Err(TelemetryError::InvalidIdentity { reason: "empty device id" });
        }
        if !id.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(TelemetryError::InvalidIdentity {
                reason: "device id must be printable ASCII without spaces",
            });
        }

        let mut inner = String::new();
        inner.push_str(id).map_err(|_| TelemetryError::InvalidIdentity {
            reason: "device id longer than 31 bytes",
        })?;
        Ok(Self(inner))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys and identifier of one node
///
/// The community key is shared by every node of a cohort; the device key is
/// unique to this node. A record signature binds both.
#[derive(Clone, Debug)]
pub struct DeviceIdentity {
    community_key: SecretKey,
    device_key: SecretKey,
    device_id: DeviceId,
}

impl DeviceIdentity {
    pub fn new(community_key: SecretKey, device_key: SecretKey, device_id: DeviceId) -> Self {
        Self {
            community_key,
            device_key,
            device_id,
        }
    }

    /// Build from raw key bytes and an identifier string
    pub fn from_parts(
        community_key: &[u8],
        device_key: &[u8],
        device_id: &str,
    ) -> TelemetryResult<Self> {
        Ok(Self::new(
            SecretKey::new(community_key)?,
            SecretKey::new(device_key)?,
            DeviceId::new(device_id)?,
        ))
    }

    pub fn community_key(&self) -> &SecretKey {
        &self.community_key
    }

    pub fn device_key(&self) -> &SecretKey {
        &self.device_key
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}
