//! Edge debouncer for the health-event input
//!
//! A push button or inhaler counter contact produces a burst of edges for a
//! single press. The debouncer accepts an edge only when the previous
//! accepted edge is more than one window old.
//!
//! ```text
//! edges:    |  ||   |          |       (t = 0, 10, 20, 70, 130 ms)
//! accepted: ^          ^        ^      (window = 50 ms)
//! ```
//!
//! The last accepted timestamp lives in a single `AtomicU64` and is updated
//! with one compare-and-swap, so `on_raw_edge` is safe to call from an
//! interrupt handler without locks or allocation. Targets without native
//! 64-bit atomics (Cortex-M, Xtensa) build with the `embedded` feature, where
//! `portable-atomic` runs each operation inside a critical section.

use portable_atomic::{AtomicU64, Ordering};

use crate::constants::DEBOUNCE_WINDOW_MS;
use crate::time::{elapsed_ms, Timestamp};

/// Marker for "no edge accepted yet"
const NEVER: u64 = u64::MAX;

/// Interrupt-safe edge debouncer
#[derive(Debug)]
pub struct EventDebouncer {
    window_ms: u64,
    last_event_time: AtomicU64,
}

impl EventDebouncer {
    /// Create a debouncer with the given window
    ///
    /// `const` so it can back a `static` shared with an ISR.
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_event_time: AtomicU64::new(NEVER),
        }
    }

    /// Debouncer with the default 50 ms window
    pub const fn with_defaults() -> Self {
        Self::new(DEBOUNCE_WINDOW_MS)
    }

    /// Feed a raw edge observed at `now`
    ///
    /// Returns `true` if the edge is a genuine event. A clock that went
    /// backwards yields a zero delta and therefore a rejection.
    pub fn on_raw_edge(&self, now: Timestamp) -> bool {
        let last = self.last_event_time.load(Ordering::Acquire);

        if last != NEVER && elapsed_ms(last, now) <= self.window_ms {
            return false;
        }

        // Losing the race means another edge was just accepted; this one is
        // inside its window by definition.
        self.last_event_time
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Timestamp of the last accepted edge
    pub fn last_event_time(&self) -> Option<Timestamp> {
        match self.last_event_time.load(Ordering::Acquire) {
            NEVER => None,
            t => Some(t),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Forget the last accepted edge
    pub fn clear(&self) {
        self.last_event_time.store(NEVER, Ordering::Release);
    }
}

impl Default for EventDebouncer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_edge_always_accepted() {
        let debouncer = EventDebouncer::with_defaults();
        assert!(debouncer.last_event_time().is_none());
        assert!(debouncer.on_raw_edge(0));
        assert_eq!(debouncer.last_event_time(), Some(0));
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let debouncer = EventDebouncer::new(50);
        assert!(debouncer.on_raw_edge(1_000));

        // Exactly one window later is still bounce
        assert!(!debouncer.on_raw_edge(1_050));
        assert!(debouncer.on_raw_edge(1_051));
    }

    #[test]
    fn rejected_edges_do_not_extend_window() {
        let debouncer = EventDebouncer::new(50);
        assert!(debouncer.on_raw_edge(0));
        assert!(!debouncer.on_raw_edge(10));
        assert!(!debouncer.on_raw_edge(20));
        assert!(debouncer.on_raw_edge(70));
        assert!(debouncer.on_raw_edge(130));
    }

    #[test]
    fn backwards_clock_rejected() {
        let debouncer = EventDebouncer::new(50);
        assert!(debouncer.on_raw_edge(5_000));
        assert!(!debouncer.on_raw_edge(1_000));
        assert_eq!(debouncer.last_event_time(), Some(5_000));
    }

    #[test]
    fn static_debouncer_keeps_full_width_timestamps() {
        static DEBOUNCER: EventDebouncer = EventDebouncer::with_defaults();

        // Past the 49.7 day rollover of a 32-bit millisecond counter
        let late = u64::from(u32::MAX) + 10;
        assert!(DEBOUNCER.on_raw_edge(late));
        assert!(!DEBOUNCER.on_raw_edge(late + 50));
        assert!(DEBOUNCER.on_raw_edge(late + 51));
        assert_eq!(DEBOUNCER.last_event_time(), Some(late + 51));
    }

    #[test]
    fn clear_rearms() {
        let debouncer = EventDebouncer::new(50);
        assert!(debouncer.on_raw_edge(100));
        debouncer.clear();
        assert!(debouncer.on_raw_edge(101));
    }
}
