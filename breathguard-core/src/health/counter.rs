//! Lock-free health-event counter shared between an ISR and the main loop
//!
//! ## Execution contexts
//!
//! ```text
//! Interrupt (button edge)             Main loop (scheduler)
//!        ↓                                  ↓        ↓
//!   record_event(now)                   tick(now)  snapshot()
//!        ↓                                  ↓        ↓
//!   debounce CAS ──→ count fetch_update ←── store 0  load
//! ```
//!
//! `record_event` may preempt `tick` or `snapshot` at any instruction. Every
//! field is its own atomic and every mutation is a single read-modify-write,
//! so neither side can observe a torn value and the interrupt never waits.
//!
//! ## Saturation
//!
//! The count is a `u8` (it is published as one byte). Once it reaches 255,
//! further events are dropped and counted in [`HealthStats::saturated`]
//! until the reset window elapses. It never wraps to zero.
//!
//! ## Example
//!
//! ```rust
//! use breathguard_core::health::{HealthCounter, HealthConfig};
//!
//! static COUNTER: HealthCounter = HealthCounter::new(HealthConfig::new(50, 3_600_000));
//!
//! // ISR
//! let _ = COUNTER.record_event(0);
//! let _ = COUNTER.record_event(10);   // bounce
//!
//! // main loop
//! COUNTER.tick(1_000);
//! assert_eq!(COUNTER.snapshot(), 1);
//! ```

use portable_atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::constants::{DEBOUNCE_WINDOW_MS, RESET_WINDOW_MS};
use crate::errors::{TelemetryError, TelemetryResult};
use crate::health::debounce::EventDebouncer;
use crate::time::{elapsed_ms, Timestamp};

/// Health counter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Minimum spacing between accepted edges (ms)
    pub debounce_ms: u64,
    /// Count is zeroed once this much time has passed since the window start (ms)
    pub reset_window_ms: u64,
}

impl HealthConfig {
    pub const fn new(debounce_ms: u64, reset_window_ms: u64) -> Self {
        Self {
            debounce_ms,
            reset_window_ms,
        }
    }

    /// Set the debounce window
    pub const fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the reset window
    pub const fn reset_window_ms(mut self, ms: u64) -> Self {
        self.reset_window_ms = ms;
        self
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW_MS, RESET_WINDOW_MS)
    }
}

/// Counter statistics
///
/// Relaxed atomics: they describe the counter, they do not guard it.
#[derive(Debug)]
pub struct HealthStats {
    /// Edges that passed the debouncer and were counted
    pub accepted: AtomicU32,
    /// Edges rejected as contact bounce
    pub bounced: AtomicU32,
    /// Genuine events lost because the counter was full
    pub saturated: AtomicU32,
    /// Window resets performed by `tick`
    pub resets: AtomicU32,
}

impl HealthStats {
    const fn new() -> Self {
        Self {
            accepted: AtomicU32::new(0),
            bounced: AtomicU32::new(0),
            saturated: AtomicU32::new(0),
            resets: AtomicU32::new(0),
        }
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> HealthStatsSnapshot {
        HealthStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            bounced: self.bounced.load(Ordering::Relaxed),
            saturated: self.saturated.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`HealthStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthStatsSnapshot {
    pub accepted: u32,
    pub bounced: u32,
    pub saturated: u32,
    pub resets: u32,
}

/// Debounced, saturating, windowed event counter
#[derive(Debug)]
pub struct HealthCounter {
    debouncer: EventDebouncer,
    event_count: AtomicU8,
    window_start: AtomicU64,
    reset_window_ms: u64,
    stats: HealthStats,
}

impl HealthCounter {
    /// Create a counter; the first window starts at timestamp 0
    pub const fn new(config: HealthConfig) -> Self {
        Self {
            debouncer: EventDebouncer::new(config.debounce_ms),
            event_count: AtomicU8::new(0),
            window_start: AtomicU64::new(0),
            reset_window_ms: config.reset_window_ms,
            stats: HealthStats::new(),
        }
    }

    /// Counter with the default 50 ms debounce and 1 h reset window
    pub const fn with_defaults() -> Self {
        Self::new(HealthConfig::new(DEBOUNCE_WINDOW_MS, RESET_WINDOW_MS))
    }

    /// Anchor the current reset window at `now` (call once at boot)
    pub fn begin_window(&self, now: Timestamp) {
        self.window_start.store(now, Ordering::Release);
    }

    /// Record a raw trigger edge (interrupt context)
    ///
    /// Returns the count after the increment.
    pub fn record_event(&self, now: Timestamp) -> TelemetryResult<u8> {
        if !self.debouncer.on_raw_edge(now) {
            self.stats.bounced.fetch_add(1, Ordering::Relaxed);
            return Err(TelemetryError::BounceRejected);
        }

        match self
            .event_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_add(1))
        {
            Ok(previous) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(previous + 1)
            }
            Err(_) => {
                self.stats.saturated.fetch_add(1, Ordering::Relaxed);
                Err(TelemetryError::CounterSaturated { max: u8::MAX })
            }
        }
    }

    /// Reset the count if the window has elapsed (main loop only)
    ///
    /// Returns `true` when a reset happened.
    pub fn tick(&self, now: Timestamp) -> bool {
        let start = self.window_start.load(Ordering::Acquire);
        if elapsed_ms(start, now) <= self.reset_window_ms {
            return false;
        }

        // Claim the window first so a reset happens exactly once per window
        // even if tick were ever called from two places.
        if self
            .window_start
            .compare_exchange(start, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let dropped = self.event_count.swap(0, Ordering::AcqRel);
        self.stats.resets.fetch_add(1, Ordering::Relaxed);
        log_info!("health window reset at {} ms ({} events cleared)", now, dropped);

        let lost = self.stats.saturated.load(Ordering::Relaxed);
        if dropped == u8::MAX && lost > 0 {
            log_warn!("health counter saturated during window; {} events lost so far", lost);
        }
        true
    }

    /// Current count (safe against concurrent `record_event`)
    pub fn snapshot(&self) -> u8 {
        self.event_count.load(Ordering::Acquire)
    }

    /// Explicit reset, independent of the window
    pub fn reset(&self) {
        self.event_count.store(0, Ordering::Release);
    }

    /// Start of the current reset window
    pub fn window_start(&self) -> Timestamp {
        self.window_start.load(Ordering::Acquire)
    }

    pub fn is_saturated(&self) -> bool {
        self.snapshot() == u8::MAX
    }

    pub fn debouncer(&self) -> &EventDebouncer {
        &self.debouncer
    }

    pub fn stats(&self) -> &HealthStats {
        &self.stats
    }
}

impl Default for HealthCounter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_burst_counts_once() {
        let counter = HealthCounter::with_defaults();
        for t in [0, 10, 20, 70, 130] {
            let _ = counter.record_event(t);
        }
        assert_eq!(counter.snapshot(), 3);

        let stats = counter.stats().snapshot();
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.bounced, 2);
    }

    #[test]
    fn saturates_without_wrapping() {
        let counter = HealthCounter::new(HealthConfig::new(50, u64::MAX));
        for i in 0..255u64 {
            assert!(counter.record_event(i * 100).is_ok());
        }
        assert!(counter.is_saturated());

        let result = counter.record_event(255 * 100);
        assert_eq!(result, Err(TelemetryError::CounterSaturated { max: 255 }));
        assert_eq!(counter.snapshot(), 255);
        assert_eq!(counter.stats().snapshot().saturated, 1);
    }

    #[test]
    fn tick_resets_once_per_window() {
        let counter = HealthCounter::with_defaults();
        counter.record_event(0).unwrap();

        assert!(!counter.tick(RESET_WINDOW_MS));
        assert_eq!(counter.snapshot(), 1);

        assert!(counter.tick(RESET_WINDOW_MS + 1));
        assert_eq!(counter.snapshot(), 0);
        assert_eq!(counter.window_start(), RESET_WINDOW_MS + 1);

        // Same instant again: new window has just started
        assert!(!counter.tick(RESET_WINDOW_MS + 1));
        assert_eq!(counter.stats().snapshot().resets, 1);
    }

    #[test]
    fn begin_window_anchors_reset() {
        let counter = HealthCounter::new(HealthConfig::new(50, 1_000));
        counter.begin_window(10_000);
        counter.record_event(10_100).unwrap();

        assert!(!counter.tick(10_900));
        assert!(counter.tick(11_001));
        assert_eq!(counter.snapshot(), 0);
    }

    #[test]
    fn explicit_reset_keeps_debounce_state() {
        let counter = HealthCounter::with_defaults();
        counter.record_event(1_000).unwrap();
        counter.reset();
        assert_eq!(counter.snapshot(), 0);

        // Still inside the window of the edge at 1000
        assert_eq!(counter.record_event(1_020), Err(TelemetryError::BounceRejected));
    }

    #[test]
    fn static_counter_windows_past_u32_range() {
        static COUNTER: HealthCounter = HealthCounter::new(HealthConfig::new(50, 1_000));

        let start = u64::from(u32::MAX) - 500;
        COUNTER.begin_window(start);
        COUNTER.record_event(start + 100).unwrap();

        assert!(!COUNTER.tick(start + 1_000));
        assert!(COUNTER.tick(start + 1_001));
        assert_eq!(COUNTER.window_start(), start + 1_001);
        assert_eq!(COUNTER.snapshot(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn concurrent_snapshots_never_decrease() {
        use std::sync::Arc;
        use std::thread;

        let counter = Arc::new(HealthCounter::new(HealthConfig::new(0, u64::MAX)));
        let producer = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for t in 1..=200u64 {
                    let _ = counter.record_event(t);
                }
            })
        };

        let mut last = 0;
        while !producer.is_finished() {
            let now = counter.snapshot();
            assert!(now >= last);
            last = now;
        }
        producer.join().unwrap();
        assert_eq!(counter.snapshot(), 200);
    }
}
