//! Core telemetry pipeline for BreathGuard sensor nodes
//!
//! Samples air quality, counts inhaler-use events from a button interrupt,
//! signs every record with two keys and publishes it to a broker over a
//! link that drops.
//!
//! Key constraints:
//! - The event counter is touched from interrupt context: atomics only
//! - No heap allocation anywhere in the pipeline
//! - Transport failures never stop the main loop
//!
//! ```no_run
//! use breathguard_core::{
//!     compose, DeviceIdentity, HealthCounter, SensorReading,
//! };
//!
//! static COUNTER: HealthCounter = HealthCounter::with_defaults();
//!
//! // Button ISR
//! let _ = COUNTER.record_event(1_000);
//!
//! // Main loop
//! let identity = DeviceIdentity::from_parts(b"community", b"device", "node_001").unwrap();
//! let reading = SensorReading::new(25.0, 40.0, 28.0, 55.0, 1_500);
//! let record = compose(reading, COUNTER.snapshot(), &identity);
//! assert!(record.verify(&identity).is_ok());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod logging;

pub mod auth;
pub mod cancel;
pub mod connectivity;
pub mod constants;
pub mod errors;
pub mod health;
pub mod identity;
pub mod reading;
pub mod record;
pub mod scheduler;
pub mod time;
pub mod traits;

// Public API
pub use auth::{RecordAuthenticator, Signature};
pub use cancel::CancelToken;
pub use connectivity::{
    topic_for_cohort, ConnectionState, ConnectionStats, ConnectivityManager, RetryPolicy, Topic,
};
pub use errors::{TelemetryError, TelemetryResult};
pub use health::{EventDebouncer, HealthConfig, HealthCounter};
pub use identity::{DeviceId, DeviceIdentity, SecretKey};
pub use reading::SensorReading;
pub use record::{compose, SignedTelemetryRecord, TelemetryComposer, WireRecord};
pub use scheduler::{SchedulerConfig, SchedulerStats, TelemetryScheduler, TickOutcome};
pub use time::{Delay, TimeSource, Timestamp};
pub use traits::{PublishChannel, RecordEncoder, SensorSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
