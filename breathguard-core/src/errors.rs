//! Error Types for the Telemetry Pipeline
//!
//! ## Design
//!
//! Errors are returned from the interrupt path (`HealthCounter::record_event`)
//! as well as the main loop, so they follow the same embedded rules as the
//! rest of the crate:
//!
//! 1. **No Heap Allocation**: only `&'static str` for messages.
//! 2. **Copy Semantics**: cheap to return from an ISR and to store in
//!    [`TickOutcome`](crate::scheduler::TickOutcome).
//!
//! ## Error Categories
//!
//! ### Filtered conditions (not failures)
//! - `BounceRejected`: raw edge arrived inside the debounce window
//!
//! ### Data loss
//! - `CounterSaturated`: health events dropped until the next reset window
//! - `InvalidValue` / `OutOfRange`: sensor reading unusable, record dropped
//!
//! ### Integrity
//! - `SignatureMismatch`: tampered or corrupted record; reject, never repair
//!
//! ### Transport (absorbed by the connectivity manager)
//! - `ConnectionFailure`, `PublishFailure`, `Encoding`
//!
//! ### Control
//! - `Cancelled`: the node is shutting down
//!
//! ## Propagation
//!
//! ```rust
//! use breathguard_core::{HealthCounter, TelemetryError};
//!
//! static COUNTER: HealthCounter = HealthCounter::with_defaults();
//!
//! fn on_button_edge(now: u64) {
//!     match COUNTER.record_event(now) {
//!         Ok(_count) => {}
//!         Err(TelemetryError::BounceRejected) => {}   // contact bounce, ignore
//!         Err(TelemetryError::CounterSaturated { .. }) => {
//!             // surfaced through HealthCounter::stats()
//!         }
//!         Err(_) => {}
//!     }
//! }
//! # on_button_edge(0);
//! ```

use thiserror_no_std::Error;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Pipeline errors - kept small and `Copy` for ISR use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TelemetryError {
    /// Raw trigger edge arrived inside the debounce window
    #[error("Trigger edge rejected as contact bounce")]
    BounceRejected,

    /// Event counter is at its maximum; event dropped until the window resets
    #[error("Health event counter saturated at {max}")]
    CounterSaturated {
        /// Largest representable count
        max: u8,
    },

    /// Recomputed signature differs from the one carried by the record
    #[error("Signature mismatch: record rejected")]
    SignatureMismatch,

    /// Could not establish a connection to the broker
    #[error("Connection failed after {attempts} attempts")]
    ConnectionFailure {
        /// Connection attempts made before giving up
        attempts: u32,
    },

    /// Send failed on an established connection; the record is dropped
    #[error("Publish failed: record dropped")]
    PublishFailure,

    /// Record could not be encoded for the wire
    #[error("Record encoding failed")]
    Encoding,

    /// Operation interrupted by the cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Reading is not a finite number
    #[error("Invalid value: not a valid number")]
    InvalidValue,

    /// Reading outside physically possible limits
    #[error("Value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// The offending reading
        value: f32,
        /// Lower physical limit
        min: f32,
        /// Upper physical limit
        max: f32,
    },

    /// Device identity material is unusable
    #[error("Invalid device identity: {reason}")]
    InvalidIdentity {
        reason: &'static str,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for TelemetryError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::BounceRejected => defmt::write!(fmt, "Bounce rejected"),
            Self::CounterSaturated { max } => defmt::write!(fmt, "Counter saturated at {}", max),
            Self::SignatureMismatch => defmt::write!(fmt, "Signature mismatch"),
            Self::ConnectionFailure { attempts } => {
                defmt::write!(fmt, "Connection failed after {} attempts", attempts)
            }
            Self::PublishFailure => defmt::write!(fmt, "Publish failed"),
            Self::Encoding => defmt::write!(fmt, "Encoding failed"),
            Self::Cancelled => defmt::write!(fmt, "Cancelled"),
            Self::InvalidValue => defmt::write!(fmt, "Invalid value"),
            Self::OutOfRange { value, min, max } => {
                defmt::write!(fmt, "Value {} outside [{}, {}]", value, min, max)
            }
            Self::InvalidIdentity { reason } => defmt::write!(fmt, "Invalid identity: {}", reason),
        }
    }
}
