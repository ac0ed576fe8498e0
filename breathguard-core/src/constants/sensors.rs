//! Sensor Physical Limits
//!
//! Bounds used to reject readings that cannot come from a working sensor.
//! These are not calibration limits: a reading inside them can still be
//! wrong, a reading outside them is certainly wrong.

/// Lowest particulate concentration (μg/m³). Negative mass is impossible.
pub const PM_MIN_UG_M3: f32 = 0.0;

/// Highest particulate concentration reported by optical PM sensors (μg/m³).
///
/// Source: PMS5003 / SDS011 datasheets (effective range 0-999 / 0-1000).
pub const PM_MAX_UG_M3: f32 = 1000.0;

/// Lowest air temperature for the node's sensor (°C).
///
/// Source: DHT22 / BME280 operating range.
pub const TEMP_MIN_C: f32 = -40.0;

/// Highest air temperature for the node's sensor (°C).
pub const TEMP_MAX_C: f32 = 85.0;

/// Relative humidity lower bound (%). Definition limit.
pub const HUMIDITY_MIN_PCT: f32 = 0.0;

/// Relative humidity upper bound (%). Definition limit.
pub const HUMIDITY_MAX_PCT: f32 = 100.0;
