//! Time management for the sensor node
//!
//! Provides clock and delay abstractions so the same pipeline runs against:
//! - A hardware tick counter (firmware)
//! - `std::time::Instant` (host builds)
//! - A simulated clock (tests, where delays advance time instantly)

use portable_atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Blocking delay provider
///
/// The scheduler sleeps between ticks and the connectivity manager waits
/// between reconnect attempts through this trait, never through a literal
/// sleep call.
pub trait Delay {
    /// Block the current context for `ms` milliseconds
    fn delay_ms(&mut self, ms: u64);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, ms: u64) {
        (**self).delay_ms(ms)
    }
}

/// Monotonic time source backed by `std::time::Instant`
///
/// Starts at 0 when constructed, always increases.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Thread-sleep delay (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Simulated clock where delays advance time instead of blocking
///
/// Shared by reference: `&SimulatedClock` is both a [`TimeSource`] and a
/// [`Delay`], so a scheduler under test can sleep for an hour in
/// microseconds of real time.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now: AtomicU64,
    slept: AtomicU64,
}

impl SimulatedClock {
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
            slept: AtomicU64::new(0),
        }
    }

    /// Jump forward without counting it as a delay
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::AcqRel);
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::Release);
    }

    /// Total milliseconds spent inside `delay_ms`
    pub fn total_slept_ms(&self) -> u64 {
        self.slept.load(Ordering::Acquire)
    }
}

impl TimeSource for SimulatedClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}

impl Delay for &SimulatedClock {
    fn delay_ms(&mut self, ms: u64) {
        self.slept.fetch_add(ms, Ordering::AcqRel);
        self.now.fetch_add(ms, Ordering::AcqRel);
    }
}

/// Milliseconds elapsed between two timestamps, zero if the clock went backwards
#[inline]
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
