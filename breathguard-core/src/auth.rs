//! Dual-key record authentication
//!
//! ## Scheme
//!
//! ```text
//! signature = hex( SHA-256( payload || community_key || device_key ) )
//! ```
//!
//! The order of the three inputs is fixed; verification recomputes the digest
//! with the same order and compares the 64-character lowercase hex strings.
//!
//! Binding two keys means a party holding only one of them cannot produce a
//! valid signature: a leaked community key does not let anyone impersonate a
//! specific node, and a compromised node cannot sign for another node of the
//! cohort.
//!
//! This is authenticity and integrity only. Sensor values travel in clear.
//!
//! ## Example
//!
//! ```rust
//! use breathguard_core::auth;
//!
//! let sig = auth::sign(b"payload", b"ck1", b"dk1");
//! assert_eq!(sig.as_str().len(), 64);
//! assert!(auth::verify(b"payload", b"ck1", b"dk1", sig.as_str()));
//! assert!(!auth::verify(b"payload", b"ck1", b"dk2", sig.as_str()));
//! ```

use core::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::device::{DIGEST_LEN, SIGNATURE_HEX_LEN};
use crate::errors::{TelemetryError, TelemetryResult};
use crate::identity::DeviceIdentity;

/// 64-character lowercase hex SHA-256 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_HEX_LEN]);

impl Signature {
    /// Parse a hex signature as carried on the wire
    ///
    /// Only the canonical form is accepted: exactly 64 characters, lowercase.
    pub fn parse(hex: &str) -> TelemetryResult<Self> {
        let bytes = hex.as_bytes();
        if bytes.len() != SIGNATURE_HEX_LEN
            || !bytes.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(TelemetryError::SignatureMismatch);
        }

        let mut out = [0u8; SIGNATURE_HEX_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        // Built only from hex digits, always valid UTF-8
        core::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_HEX_LEN] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.as_str())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign `payload` with both keys
pub fn sign(payload: &[u8], community_key: &[u8], device_key: &[u8]) -> Signature {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.update(community_key);
    hasher.update(device_key);
    let digest: [u8; DIGEST_LEN] = hasher.finalize().into();

    let mut hex = [0u8; SIGNATURE_HEX_LEN];
    // Output buffer is exactly twice the digest length, encoding cannot fail
    let _ = hex::encode_to_slice(digest, &mut hex);
    Signature(hex)
}

/// Check `signature` against a fresh signature over the same inputs
///
/// Any mismatch, including a wrong length, yields `false`. Once lengths
/// match, the comparison is constant-time.
pub fn verify(payload: &[u8], community_key: &[u8], device_key: &[u8], signature: &str) -> bool {
    let candidate = signature.as_bytes();
    if candidate.len() != SIGNATURE_HEX_LEN {
        return false;
    }

    let expected = sign(payload, community_key, device_key);
    bool::from(expected.as_bytes()[..].ct_eq(candidate))
}

/// [`verify`] as a `Result`, for `?` chains on the ingestion side
pub fn verify_strict(
    payload: &[u8],
    community_key: &[u8],
    device_key: &[u8],
    signature: &str,
) -> TelemetryResult<()> {
    if verify(payload, community_key, device_key, signature) {
        Ok(())
    } else {
        Err(TelemetryError::SignatureMismatch)
    }
}

/// Signs and verifies with the keys of one [`DeviceIdentity`]
#[derive(Debug, Clone, Copy)]
pub struct RecordAuthenticator<'a> {
    identity: &'a DeviceIdentity,
}

impl<'a> RecordAuthenticator<'a> {
    pub fn new(identity: &'a DeviceIdentity) -> Self {
        Self { identity }
    }

    pub fn sign(&self, payload: &[u8]) -> Signature {
        sign(
            payload,
            self.identity.community_key().as_bytes(),
            self.identity.device_key().as_bytes(),
        )
    }

    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        verify(
            payload,
            self.identity.community_key().as_bytes(),
            self.identity.device_key().as_bytes(),
            signature,
        )
    }

    pub fn verify_strict(&self, payload: &[u8], signature: &str) -> TelemetryResult<()> {
        verify_strict(
            payload,
            self.identity.community_key().as_bytes(),
            self.identity.device_key().as_bytes(),
            signature,
        )
    }
}
