//! Environmental sensor readings
//!
//! A [`SensorReading`] is produced by a [`SensorSource`](crate::traits::SensorSource)
//! and is immutable once read. Before a reading is signed it is checked
//! against physical limits: a NaN or a negative particulate mass can only
//! come from a broken sensor or bus, and a non-finite float would not
//! survive the JSON wire format anyway.

use crate::constants::sensors::{
    HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT, PM_MAX_UG_M3, PM_MIN_UG_M3, TEMP_MAX_C, TEMP_MIN_C,
};
use crate::errors::{TelemetryError, TelemetryResult};
use crate::time::Timestamp;
use crate::traits::Validatable;

/// One sample of every environmental channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// PM2.5 concentration (μg/m³)
    pub pm25: f32,
    /// PM10 concentration (μg/m³)
    pub pm10: f32,
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
    /// Monotonic milliseconds; 0 means "not stamped yet"
    pub timestamp: Timestamp,
}

impl SensorReading {
    pub const fn new(
        pm25: f32,
        pm10: f32,
        temperature: f32,
        humidity: f32,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            pm25,
            pm10,
            temperature,
            humidity,
            timestamp,
        }
    }

    /// Copy with a different timestamp
    pub const fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub const fn is_stamped(&self) -> bool {
        self.timestamp != 0
    }

    /// Reject non-finite and physically impossible values
    pub fn validate(&self) -> TelemetryResult<()> {
        check(self.pm25, PM_MIN_UG_M3, PM_MAX_UG_M3)?;
        check(self.pm10, PM_MIN_UG_M3, PM_MAX_UG_M3)?;
        check(self.temperature, TEMP_MIN_C, TEMP_MAX_C)?;
        check(self.humidity, HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT)?;
        Ok(())
    }
}

fn check(value: f32, min: f32, max: f32) -> TelemetryResult<()> {
    if !value.is_valid() {
        return Err(TelemetryError::InvalidValue);
    }
    if value < min || value > max {
        return Err(TelemetryError::OutOfRange { value, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_reading_is_valid() {
        let reading = SensorReading::new(25.0, 40.0, 28.0, 55.0, 1000);
        assert!(reading.validate().is_ok());
        assert!(reading.is_stamped());
    }

    #[test]
    fn nan_rejected() {
        let reading = SensorReading::new(f32::NAN, 40.0, 28.0, 55.0, 1000);
        assert_eq!(reading.validate(), Err(TelemetryError::InvalidValue));

        let reading = SensorReading::new(25.0, 40.0, f32::INFINITY, 55.0, 1000);
        assert_eq!(reading.validate(), Err(TelemetryError::InvalidValue));
    }

    #[test]
    fn impossible_values_rejected() {
        let negative_pm = SensorReading::new(-1.0, 40.0, 28.0, 55.0, 1000);
        assert!(matches!(negative_pm.validate(), Err(TelemetryError::OutOfRange { .. })));

        let supersaturated = SensorReading::new(25.0, 40.0, 28.0, 101.0, 1000);
        assert!(matches!(
            supersaturated.validate(),
            Err(TelemetryError::OutOfRange { max, .. }) if max == 100.0
        ));
    }

    #[test]
    fn restamping() {
        let reading = SensorReading::new(25.0, 40.0, 28.0, 55.0, 0);
        assert!(!reading.is_stamped());
        assert_eq!(reading.at(42).timestamp, 42);
    }
}
