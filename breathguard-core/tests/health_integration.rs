//! Integration tests for the health-event counter
//!
//! Covers the debounce and reset-window properties, including a real
//! second thread standing in for the interrupt handler.

use std::sync::Arc;
use std::thread;

use breathguard_core::{
    health::{HealthConfig, HealthCounter},
    TelemetryError,
};
use proptest::prelude::*;

const WINDOW_MS: u64 = 50;
const RESET_MS: u64 = 3_600_000;

#[test]
fn bounce_burst_scenario() {
    let counter = HealthCounter::new(HealthConfig::new(WINDOW_MS, RESET_MS));

    let accepted: Vec<u64> = [0u64, 10, 20, 70, 130]
        .into_iter()
        .filter(|&t| counter.record_event(t).is_ok())
        .collect();

    assert_eq!(accepted, vec![0, 70, 130]);
    assert_eq!(counter.snapshot(), 3);
}

#[test]
fn reset_window_scenario() {
    let counter = HealthCounter::new(HealthConfig::new(WINDOW_MS, RESET_MS));
    assert_eq!(counter.record_event(0), Ok(1));

    assert!(counter.tick(3_600_001));
    assert_eq!(counter.snapshot(), 0);

    // The next event starts the new window's count from zero
    assert_eq!(counter.record_event(3_600_100), Ok(1));
}

#[test]
fn isr_thread_and_poller_agree() {
    // Edges spaced 100 ms apart on a 50 ms window: every one counts
    let counter = Arc::new(HealthCounter::new(HealthConfig::new(WINDOW_MS, u64::MAX)));

    let isr = {
        let counter = Arc::clone(&counter);
        thread::spawn(move || {
            let mut accepted = 0u32;
            for i in 0..100u64 {
                if counter.record_event(i * 100).is_ok() {
                    accepted += 1;
                }
            }
            accepted
        })
    };

    let mut observed = Vec::new();
    while !isr.is_finished() {
        observed.push(counter.snapshot());
        counter.tick(0);
    }
    let accepted = isr.join().unwrap();

    assert_eq!(accepted, 100);
    assert_eq!(counter.snapshot(), 100);
    assert!(observed.windows(2).all(|w| w[0] <= w[1]));
}

proptest! {
    #[test]
    fn debounce_holds_for_close_pairs(t1 in 0u64..1_000_000_000, gap in 0u64..=WINDOW_MS) {
        let counter = HealthCounter::new(HealthConfig::new(WINDOW_MS, u64::MAX));
        prop_assert_eq!(counter.record_event(t1), Ok(1));
        prop_assert_eq!(counter.record_event(t1 + gap), Err(TelemetryError::BounceRejected));
        prop_assert_eq!(counter.snapshot(), 1);
    }

    #[test]
    fn distant_pairs_both_count(t1 in 0u64..1_000_000_000, gap in (WINDOW_MS + 1)..100_000u64) {
        let counter = HealthCounter::new(HealthConfig::new(WINDOW_MS, u64::MAX));
        prop_assert_eq!(counter.record_event(t1), Ok(1));
        prop_assert_eq!(counter.record_event(t1 + gap), Ok(2));
    }

    #[test]
    fn count_only_drops_on_reset(
        steps in proptest::collection::vec((0u64..200, any::<bool>()), 1..300)
    ) {
        let counter = HealthCounter::new(HealthConfig::new(WINDOW_MS, 5_000));
        let mut now = 0u64;
        let mut last = counter.snapshot();

        for (advance, is_edge) in steps {
            now += advance;
            let reset = if is_edge {
                let _ = counter.record_event(now);
                false
            } else {
                counter.tick(now)
            };

            let current = counter.snapshot();
            if reset {
                prop_assert_eq!(current, 0);
            } else {
                prop_assert!(current >= last);
                prop_assert!(current - last <= 1);
            }
            last = current;
        }
    }
}
