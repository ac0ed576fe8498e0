//! Signed telemetry records and their canonical payload
//!
//! ## Canonical payload
//!
//! The signature covers a fixed binary layout, not the JSON text, so the
//! wire encoding can change (field order, whitespace, float formatting)
//! without breaking verification:
//!
//! ```text
//! offset  size  field
//! 0       4     tag "BGv1"
//! 4       4     pm25          f32 little-endian
//! 8       4     pm10          f32 little-endian
//! 12      4     temperature   f32 little-endian
//! 16      4     humidity      f32 little-endian
//! 20      8     timestamp     u64 little-endian
//! 28      1     health_events u8
//! 29      1     device_id length n
//! 30      n     device_id bytes (ASCII)
//! ```
//!
//! Any change to this layout must come with a new tag.

use heapless::Vec;

use crate::auth::{RecordAuthenticator, Signature};
use crate::constants::device::{PAYLOAD_CAPACITY, PAYLOAD_TAG};
use crate::errors::TelemetryResult;
use crate::identity::{DeviceId, DeviceIdentity};
use crate::reading::SensorReading;
use crate::time::TimeSource;

/// Canonical bytes covered by the signature
pub type Payload = Vec<u8, PAYLOAD_CAPACITY>;

/// Serialize the signed fields in canonical order
pub fn canonical_payload(
    reading: &SensorReading,
    health_events: u8,
    device_id: &DeviceId,
) -> Payload {
    let id = device_id.as_str().as_bytes();
    let mut out = Payload::new();

    put(&mut out, PAYLOAD_TAG);
    put(&mut out, &reading.pm25.to_le_bytes());
    put(&mut out, &reading.pm10.to_le_bytes());
    put(&mut out, &reading.temperature.to_le_bytes());
    put(&mut out, &reading.humidity.to_le_bytes());
    put(&mut out, &reading.timestamp.to_le_bytes());
    put(&mut out, &[health_events, id.len() as u8]);
    put(&mut out, id);
    out
}

fn put(out: &mut Payload, bytes: &[u8]) {
    // DeviceId is capped at 31 bytes, so the largest layout is 61 bytes
    let pushed = out.extend_from_slice(bytes);
    debug_assert!(pushed.is_ok(), "canonical payload exceeds capacity");
}

/// A reading bound to a health count and a device, with its signature
///
/// Fields are private: a record is never mutated after signing.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTelemetryRecord {
    reading: SensorReading,
    health_events: u8,
    device_id: DeviceId,
    signature: Signature,
}

impl SignedTelemetryRecord {
    /// Reassemble a record received from the wire
    ///
    /// Nothing is checked here; call [`verify`](Self::verify) before
    /// trusting any field.
    pub fn from_parts(
        reading: SensorReading,
        health_events: u8,
        device_id: DeviceId,
        signature: Signature,
    ) -> Self {
        Self {
            reading,
            health_events,
            device_id,
            signature,
        }
    }

    pub fn reading(&self) -> &SensorReading {
        &self.reading
    }

    pub fn health_events(&self) -> u8 {
        self.health_events
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Canonical payload of the signed fields
    pub fn payload(&self) -> Payload {
        canonical_payload(&self.reading, self.health_events, &self.device_id)
    }

    /// Recompute the signature with `identity` and compare
    pub fn verify(&self, identity: &DeviceIdentity) -> TelemetryResult<()> {
        RecordAuthenticator::new(identity).verify_strict(&self.payload(), self.signature.as_str())
    }

    /// Borrowed view in the outbound wire shape
    pub fn to_wire<'a>(&'a self, version: &'a str) -> WireRecord<'a> {
        WireRecord {
            pm25: self.reading.pm25,
            pm10: self.reading.pm10,
            temperature: self.reading.temperature,
            humidity: self.reading.humidity,
            timestamp: self.reading.timestamp,
            health_events: self.health_events,
            device_id: self.device_id.as_str(),
            signature: self.signature.as_str(),
            encrypted: true,
            version,
        }
    }
}

/// Outbound record shape; field names are fixed by the ingestion side
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WireRecord<'a> {
    pub pm25: f32,
    pub pm10: f32,
    pub temperature: f32,
    pub humidity: f32,
    pub timestamp: u64,
    pub health_events: u8,
    pub device_id: &'a str,
    pub signature: &'a str,
    pub encrypted: bool,
    pub version: &'a str,
}

/// Builds signed records for one device
#[derive(Debug, Clone, Copy)]
pub struct TelemetryComposer<'a> {
    identity: &'a DeviceIdentity,
}

impl<'a> TelemetryComposer<'a> {
    pub fn new(identity: &'a DeviceIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &'a DeviceIdentity {
        self.identity
    }

    /// Sign `reading` together with `health_events` and the device id
    pub fn compose(&self, reading: SensorReading, health_events: u8) -> SignedTelemetryRecord {
        let device_id = self.identity.device_id().clone();
        let payload = canonical_payload(&reading, health_events, &device_id);
        let signature = RecordAuthenticator::new(self.identity).sign(&payload);

        SignedTelemetryRecord {
            reading,
            health_events,
            device_id,
            signature,
        }
    }

    /// Like [`compose`](Self::compose), stamping an unstamped reading from `clock`
    pub fn compose_with_clock<T: TimeSource + ?Sized>(
        &self,
        reading: SensorReading,
        health_events: u8,
        clock: &T,
    ) -> SignedTelemetryRecord {
        let reading = if reading.is_stamped() {
            reading
        } else {
            reading.at(clock.now())
        };
        self.compose(reading, health_events)
    }
}

/// Compose and sign a record in one call
pub fn compose(
    reading: SensorReading,
    health_count: u8,
    identity: &DeviceIdentity,
) -> SignedTelemetryRecord {
    TelemetryComposer::new(identity).compose(reading, health_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TelemetryError;
    use crate::time::FixedTime;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_parts(b"ck1", b"dk1", "node_001").unwrap()
    }

    fn reading() -> SensorReading {
        SensorReading::new(25.0, 40.0, 28.0, 55.0, 1000)
    }

    #[test]
    fn payload_layout() {
        let id = DeviceId::new("node_001").unwrap();
        let payload = canonical_payload(&reading(), 3, &id);

        assert_eq!(payload.len(), 30 + 8);
        assert_eq!(&payload[..4], b"BGv1");
        assert_eq!(&payload[4..8], &25.0f32.to_le_bytes());
        assert_eq!(&payload[20..28], &1000u64.to_le_bytes());
        assert_eq!(payload[28], 3);
        assert_eq!(payload[29], 8);
        assert_eq!(&payload[30..], b"node_001");
    }

    #[test]
    fn longest_id_fits() {
        let id = DeviceId::new(&"n".repeat(31)).unwrap();
        let payload = canonical_payload(&reading(), 255, &id);
        assert_eq!(payload.len(), 61);
    }

    #[test]
    fn compose_is_deterministic() {
        let identity = identity();
        let first = compose(reading(), 3, &identity);
        let second = compose(reading(), 3, &identity);
        assert_eq!(first.signature(), second.signature());

        let bumped = compose(reading(), 4, &identity);
        assert_ne!(first.signature(), bumped.signature());
    }

    #[test]
    fn verify_detects_foreign_keys() {
        let record = compose(reading(), 3, &identity());
        assert!(record.verify(&identity()).is_ok());

        let other = DeviceIdentity::from_parts(b"ck1", b"dk2", "node_001").unwrap();
        assert_eq!(record.verify(&other), Err(TelemetryError::SignatureMismatch));
    }

    #[test]
    fn tampered_fields_fail_verification() {
        let record = compose(reading(), 3, &identity());

        let forged = SignedTelemetryRecord::from_parts(
            record.reading().at(2000),
            record.health_events(),
            record.device_id().clone(),
            *record.signature(),
        );
        assert!(forged.verify(&identity()).is_err());

        let forged = SignedTelemetryRecord::from_parts(
            *record.reading(),
            0,
            record.device_id().clone(),
            *record.signature(),
        );
        assert!(forged.verify(&identity()).is_err());
    }

    #[test]
    fn clock_stamps_only_unstamped_readings() {
        let identity = identity();
        let composer = TelemetryComposer::new(&identity);
        let clock = FixedTime::new(5_000);

        let stamped = composer.compose_with_clock(reading(), 0, &clock);
        assert_eq!(stamped.reading().timestamp, 1000);

        let unstamped = composer.compose_with_clock(reading().at(0), 0, &clock);
        assert_eq!(unstamped.reading().timestamp, 5_000);
    }

    #[test]
    fn wire_view_carries_fixed_fields() {
        let record = compose(reading(), 3, &identity());
        let wire = record.to_wire("2.0-ej-ai");

        assert!(wire.encrypted);
        assert_eq!(wire.version, "2.0-ej-ai");
        assert_eq!(wire.device_id, "node_001");
        assert_eq!(wire.signature, record.signature().as_str());
        assert_eq!(wire.health_events, 3);
    }
}
