//! Simulated sensor source for hosts without real hardware
//!
//! Produces plausible readings around a baseline with bounded noise from a
//! linear congruential generator, so runs are reproducible per seed.
//! Readings are left unstamped; the composer stamps them from its clock.

use breathguard_core::constants::sensors::{
    HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT, PM_MAX_UG_M3, PM_MIN_UG_M3, TEMP_MAX_C, TEMP_MIN_C,
};
use breathguard_core::{SensorReading, SensorSource};

/// Baseline for a humid Gulf Coast summer afternoon
const BASELINE: SensorReading = SensorReading::new(12.0, 20.0, 29.0, 70.0, 0);

#[derive(Debug, Clone)]
pub struct SimulatedSensors {
    seed: u32,
    baseline: SensorReading,
    /// Peak noise as a fraction of the baseline value
    noise: f32,
}

impl SimulatedSensors {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            baseline: BASELINE,
            noise: 0.2,
        }
    }

    pub fn baseline(mut self, baseline: SensorReading) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn noise(mut self, fraction: f32) -> Self {
        self.noise = fraction.abs();
        self
    }

    /// Uniform in [-1, 1]
    fn next_unit(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.seed >> 8) as f32 / 8_388_608.0 - 1.0
    }

    fn jitter(&mut self, value: f32, min: f32, max: f32) -> f32 {
        let noisy = value + value.abs() * self.noise * self.next_unit();
        noisy.clamp(min, max)
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}

impl SensorSource for SimulatedSensors {
    fn read(&mut self) -> SensorReading {
        let b = self.baseline;
        let pm25 = self.jitter(b.pm25, PM_MIN_UG_M3, PM_MAX_UG_M3);
        // PM10 includes PM2.5
        let pm10 = self.jitter(b.pm10, PM_MIN_UG_M3, PM_MAX_UG_M3).max(pm25);

        SensorReading::new(
            pm25,
            pm10,
            self.jitter(b.temperature, TEMP_MIN_C, TEMP_MAX_C),
            self.jitter(b.humidity, HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT),
            0,
        )
    }
}
