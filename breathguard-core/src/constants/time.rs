//! Time-Related Constants
//!
//! Intervals used by the health counter, the scheduler and the
//! connectivity manager. All values in milliseconds unless the name says
//! otherwise.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Minutes per hour.
pub const MINUTES_PER_HOUR: u64 = 60;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: u64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

/// Milliseconds per hour.
pub const MS_PER_HOUR: u64 = MS_PER_MINUTE * MINUTES_PER_HOUR;

// ===== HEALTH EVENT INPUT =====

/// Debounce window for the health-event button (milliseconds).
///
/// Mechanical inhaler counters and push buttons bounce for 5-20 ms.
/// Two edges closer than this are treated as one press.
pub const DEBOUNCE_WINDOW_MS: u64 = 50;

/// Health-event counter reset window (milliseconds).
///
/// The count published with each record covers at most the last hour.
pub const RESET_WINDOW_MS: u64 = MS_PER_HOUR;

// ===== PUBLISHING =====

/// Interval between published records (milliseconds).
pub const PUBLISH_INTERVAL_MS: u64 = 30 * MS_PER_SECOND;

/// Fixed delay between broker reconnect attempts (milliseconds).
///
/// No backoff and no jitter. A node retries every 5 s until the broker is
/// back, so a cohort that lost the broker together reconnects together;
/// brokers are sized for one connect per node per delay.
pub const RECONNECT_DELAY_MS: u64 = 5 * MS_PER_SECOND;

/// Time allowed for the broker to acknowledge a connect or publish on host
/// builds (milliseconds).
pub const NETWORK_TIMEOUT_MS: u64 = 10 * MS_PER_SECOND;
