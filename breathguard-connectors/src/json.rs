//! JSON wire encoding
//!
//! Outbound records are serialized from the core's borrowed
//! [`WireRecord`](breathguard_core::WireRecord) view into a reusable
//! buffer. Inbound records (the ingestion side) are parsed back into a
//! [`SignedTelemetryRecord`] whose signature can be checked with the
//! sender's identity.

use breathguard_core::constants::DEFAULT_FIRMWARE_VERSION;
use breathguard_core::{
    DeviceId, DeviceIdentity, RecordEncoder, SensorReading, Signature, SignedTelemetryRecord,
    TelemetryError,
};
use serde::Deserialize;
use thiserror::Error;

use crate::ConnectorError;

/// Encodes records as the JSON object the ingestion bridge expects
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    version: String,
    buffer: Vec<u8>,
}

impl JsonEncoder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FIRMWARE_VERSION)
    }
}

impl RecordEncoder for JsonEncoder {
    type Error = serde_json::Error;

    fn encode(&mut self, record: &SignedTelemetryRecord) -> Result<&[u8], Self::Error> {
        self.buffer.clear();
        serde_json::to_writer(&mut self.buffer, &record.to_wire(&self.version))?;
        Ok(&self.buffer)
    }
}

/// Errors while parsing an inbound record
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `encrypted` missing or false: the record was never signed
    #[error("Record is not marked as signed")]
    Unsigned,

    #[error("Invalid field: {0}")]
    Field(#[from] TelemetryError),
}

#[derive(Debug, Deserialize)]
struct InboundRecord {
    pm25: f32,
    pm10: f32,
    temperature: f32,
    humidity: f32,
    timestamp: u64,
    health_events: u8,
    device_id: String,
    signature: String,
    #[serde(default)]
    encrypted: bool,
    #[serde(default)]
    version: Option<String>,
}

/// A parsed record plus the sender's firmware version
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    pub record: SignedTelemetryRecord,
    pub version: Option<String>,
}

impl IngestedRecord {
    /// Check the signature against the sender's identity
    ///
    /// The device id in the record must match the identity as well.
    pub fn verify(&self, identity: &DeviceIdentity) -> Result<(), TelemetryError> {
        if self.record.device_id() != identity.device_id() {
            return Err(TelemetryError::SignatureMismatch);
        }
        self.record.verify(identity)
    }
}

/// Parse one JSON record
///
/// Nothing is trusted yet; call [`IngestedRecord::verify`].
pub fn decode_record(bytes: &[u8]) -> Result<IngestedRecord, DecodeError> {
    let inbound: InboundRecord = serde_json::from_slice(bytes)?;
    if !inbound.encrypted {
        return Err(DecodeError::Unsigned);
    }

    let reading = SensorReading::new(
        inbound.pm25,
        inbound.pm10,
        inbound.temperature,
        inbound.humidity,
        inbound.timestamp,
    );
    let record = SignedTelemetryRecord::from_parts(
        reading,
        inbound.health_events,
        DeviceId::new(&inbound.device_id)?,
        Signature::parse(&inbound.signature)?,
    );

    Ok(IngestedRecord {
        record,
        version: inbound.version,
    })
}

/// Parse and verify against a known sender in one step
pub fn decode_verified(
    bytes: &[u8],
    identity: &DeviceIdentity,
) -> Result<IngestedRecord, ConnectorError> {
    let ingested = decode_record(bytes)?;
    ingested.verify(identity)?;
    Ok(ingested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breathguard_core::compose;
    use proptest::prelude::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_parts(b"ck1", b"dk1", "node_001").unwrap()
    }

    fn record(events: u8) -> SignedTelemetryRecord {
        compose(SensorReading::new(25.0, 40.0, 28.0, 55.0, 1000), events, &identity())
    }

    #[test]
    fn test_wire_shape() {
        let record = record(3);
        let mut encoder = JsonEncoder::default();
        let bytes = encoder.encode(&record).unwrap();
        let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();

        assert_eq!(value["pm25"], 25.0);
        assert_eq!(value["pm10"], 40.0);
        assert_eq!(value["temperature"], 28.0);
        assert_eq!(value["humidity"], 55.0);
        assert_eq!(value["timestamp"], 1000);
        assert_eq!(value["health_events"], 3);
        assert_eq!(value["device_id"], "node_001");
        assert_eq!(value["signature"], record.signature().as_str());
        assert_eq!(value["encrypted"], true);
        assert_eq!(value["version"], "2.0-ej-ai");
        assert_eq!(value.as_object().unwrap().len(), 10);
    }

    #[test]
    fn test_encoder_reuses_buffer() {
        let mut encoder = JsonEncoder::new("test");
        let first = encoder.encode(&record(1)).unwrap().to_vec();
        let second = encoder.encode(&record(2)).unwrap().to_vec();

        assert_ne!(first, second);
        assert!(std::str::from_utf8(&second).unwrap().contains("\"health_events\":2"));
    }

    #[test]
    fn test_decode_and_verify() {
        let mut encoder = JsonEncoder::default();
        let bytes = encoder.encode(&record(3)).unwrap().to_vec();

        let ingested = decode_record(&bytes).unwrap();
        assert_eq!(ingested.version.as_deref(), Some("2.0-ej-ai"));
        assert_eq!(ingested.record, record(3));
        assert!(ingested.verify(&identity()).is_ok());
    }

    #[test]
    fn test_decode_rejects_unsigned() {
        let text = format!(
            r#"{{"pm25":1.0,"pm10":2.0,"temperature":20.0,"humidity":40.0,"timestamp":5,
                "health_events":0,"device_id":"node_001","signature":"{}","encrypted":false}}"#,
            "0".repeat(64)
        );
        assert!(matches!(decode_record(text.as_bytes()), Err(DecodeError::Unsigned)));

        let missing = text.replace(r#","encrypted":false"#, "");
        assert!(matches!(decode_record(missing.as_bytes()), Err(DecodeError::Unsigned)));
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        let short_sig = r#"{"pm25":1.0,"pm10":2.0,"temperature":20.0,"humidity":40.0,"timestamp":5,
            "health_events":0,"device_id":"node_001","signature":"abc","encrypted":true}"#;
        assert!(matches!(
            decode_record(short_sig.as_bytes()),
            Err(DecodeError::Field(TelemetryError::SignatureMismatch))
        ));

        let overflow = r#"{"pm25":1.0,"pm10":2.0,"temperature":20.0,"humidity":40.0,"timestamp":5,
            "health_events":256,"device_id":"node_001","signature":"abc","encrypted":true}"#;
        assert!(matches!(decode_record(overflow.as_bytes()), Err(DecodeError::Json(_))));

        assert!(matches!(decode_record(b"not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_tampered_count_fails_verification() {
        let mut encoder = JsonEncoder::default();
        let text = String::from_utf8(encoder.encode(&record(3)).unwrap().to_vec()).unwrap();
        let forged = text.replace("\"health_events\":3", "\"health_events\":4");

        let ingested = decode_record(forged.as_bytes()).unwrap();
        assert_eq!(
            ingested.verify(&identity()),
            Err(TelemetryError::SignatureMismatch)
        );
    }

    #[test]
    fn test_decode_verified() {
        let mut encoder = JsonEncoder::default();
        let bytes = encoder.encode(&record(5)).unwrap().to_vec();

        let ingested = decode_verified(&bytes, &identity()).unwrap();
        assert_eq!(ingested.record.health_events(), 5);

        let other = DeviceIdentity::from_parts(b"ck2", b"dk1", "node_001").unwrap();
        assert!(matches!(
            decode_verified(&bytes, &other),
            Err(ConnectorError::Telemetry(TelemetryError::SignatureMismatch))
        ));
        assert!(matches!(
            decode_verified(b"{}", &identity()),
            Err(ConnectorError::Decode(DecodeError::Json(_)))
        ));
    }

    #[test]
    fn test_identity_mismatch() {
        let mut encoder = JsonEncoder::default();
        let bytes = encoder.encode(&record(0)).unwrap().to_vec();
        let other = DeviceIdentity::from_parts(b"ck1", b"dk1", "node_002").unwrap();

        let ingested = decode_record(&bytes).unwrap();
        assert_eq!(ingested.verify(&other), Err(TelemetryError::SignatureMismatch));
    }

    proptest! {
        #[test]
        fn encoded_readings_verify_after_transport(
            pm25 in 0.0f32..1000.0,
            temperature in -40.0f32..85.0,
            humidity in 0.0f32..100.0,
            timestamp in 1u64..u64::MAX / 2,
            events in any::<u8>(),
        ) {
            let identity = identity();
            let reading = SensorReading::new(pm25, pm25 * 0.5, temperature, humidity, timestamp);
            let record = compose(reading, events, &identity);

            let mut encoder = JsonEncoder::default();
            let bytes = encoder.encode(&record).unwrap().to_vec();
            let ingested = decode_record(&bytes).unwrap();

            prop_assert!(ingested.verify(&identity).is_ok());
        }
    }
}
