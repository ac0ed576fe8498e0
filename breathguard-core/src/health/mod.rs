//! Health-event input: debounced, windowed inhaler-use counting
//!
//! The only state shared with interrupt context lives here. Everything is
//! built on atomics so a `static HealthCounter` can be touched from an ISR
//! and from the main loop without a critical section.

pub mod counter;
pub mod debounce;

pub use counter::{HealthConfig, HealthCounter, HealthStats, HealthStatsSnapshot};
pub use debounce::EventDebouncer;
