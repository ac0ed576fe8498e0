//! Common test doubles for integration tests
//!
//! - `ScriptedChannel`: a broker link whose connect/send results follow a script
//! - `FixedSensors`: a sensor source replaying a list of readings
//! - `CaptureEncoder`: records every encoded record for later inspection

#![allow(dead_code)]

use std::collections::VecDeque;

use breathguard_core::{
    DeviceIdentity, PublishChannel, RecordEncoder, SensorReading, SensorSource,
    SignedTelemetryRecord,
};

pub const COMMUNITY_KEY: &[u8] = b"ck1";
pub const DEVICE_KEY: &[u8] = b"dk1";
pub const DEVICE_ID: &str = "node_001";

pub fn identity() -> DeviceIdentity {
    DeviceIdentity::from_parts(COMMUNITY_KEY, DEVICE_KEY, DEVICE_ID).expect("valid test identity")
}

/// Reading used across scenarios
pub fn reference_reading() -> SensorReading {
    SensorReading::new(25.0, 40.0, 28.0, 55.0, 1000)
}

/// Broker link driven by two scripts
///
/// Each `connect`/`send` pops the next scripted result; an empty script
/// means success.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    pub connect_script: VecDeque<bool>,
    pub send_script: VecDeque<bool>,
    pub connects: u32,
    pub up: bool,
    /// Refuse every connect regardless of the script
    pub offline: bool,
    pub sent: Vec<(String, Vec<u8>)>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` connects
    pub fn failing_connects(mut self, n: usize) -> Self {
        self.connect_script.extend(std::iter::repeat(false).take(n));
        self
    }

    /// Refuse every connect
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Queue send results
    pub fn sends(mut self, results: &[bool]) -> Self {
        self.send_script.extend(results.iter().copied());
        self
    }
}

impl PublishChannel for ScriptedChannel {
    type Error = &'static str;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connects += 1;
        if !self.offline && self.connect_script.pop_front().unwrap_or(true) {
            self.up = true;
            Ok(())
        } else {
            self.up = false;
            Err("connection refused")
        }
    }

    fn is_connected(&self) -> bool {
        self.up
    }

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if self.send_script.pop_front().unwrap_or(true) {
            self.sent.push((topic.to_string(), data.to_vec()));
            Ok(())
        } else {
            self.up = false;
            Err("broken pipe")
        }
    }
}

/// Replays readings in order, repeating the last one
#[derive(Debug, Clone)]
pub struct FixedSensors {
    readings: Vec<SensorReading>,
    next: usize,
}

impl FixedSensors {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        assert!(!readings.is_empty());
        Self { readings, next: 0 }
    }

    pub fn constant(reading: SensorReading) -> Self {
        Self::new(vec![reading])
    }

    pub fn reads(&self) -> usize {
        self.next
    }
}

impl SensorSource for FixedSensors {
    fn read(&mut self) -> SensorReading {
        let idx = self.next.min(self.readings.len() - 1);
        self.next += 1;
        self.readings[idx]
    }
}

/// Encodes the signature text and keeps every record it saw
#[derive(Debug, Default)]
pub struct CaptureEncoder {
    pub records: Vec<SignedTelemetryRecord>,
    buffer: Vec<u8>,
}

impl RecordEncoder for CaptureEncoder {
    type Error = ();

    fn encode(&mut self, record: &SignedTelemetryRecord) -> Result<&[u8], Self::Error> {
        self.records.push(record.clone());
        self.buffer.clear();
        self.buffer.extend_from_slice(record.signature().as_str().as_bytes());
        Ok(&self.buffer)
    }
}
