//! Cooperative cancellation
//!
//! The reconnect loop and the scheduler loop block by design. A
//! [`CancelToken`] is the one way to stop them: a shutdown handler (or a
//! test) sets it, the loops check it between attempts and between ticks.

use core::sync::atomic::{AtomicBool, Ordering};

/// One-shot cancellation flag, usable from a `static`
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
