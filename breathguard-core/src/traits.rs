//! Collaborator traits
//!
//! The pipeline talks to hardware and transport only through these traits.
//! Keep them simple: a firmware build implements them over a sensor driver
//! and a Wi-Fi MQTT client, tests implement them with a few lines of script.

use crate::reading::SensorReading;
use crate::record::SignedTelemetryRecord;

/// Source of calibrated environmental readings
///
/// `read` is synchronous and must return quickly; the scheduler calls it
/// once per tick and never waits on it.
pub trait SensorSource {
    /// Take a fresh reading
    ///
    /// Implementations may leave `timestamp` at 0; the composer stamps it.
    fn read(&mut self) -> SensorReading;
}

impl<S: SensorSource + ?Sized> SensorSource for &mut S {
    fn read(&mut self) -> SensorReading {
        (**self).read()
    }
}

/// Transport to the remote broker
pub trait PublishChannel {
    /// Transport-specific error, only ever logged
    type Error: core::fmt::Debug;

    /// Attempt to establish the link; one attempt, no internal retry
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Check if the link is believed to be up
    fn is_connected(&self) -> bool;

    /// Send one message on `topic`
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;
}

/// Wire encoder for signed records
pub trait RecordEncoder {
    type Error: core::fmt::Debug;

    /// Encode `record`; the returned bytes stay valid until the next call
    fn encode(&mut self, record: &SignedTelemetryRecord) -> Result<&[u8], Self::Error>;
}

/// Trait for values that can be validated
pub trait Validatable {
    /// Check if the value is physically valid (not NaN, infinite, etc)
    fn is_valid(&self) -> bool;
}

impl Validatable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}
