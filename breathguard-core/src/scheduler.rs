//! Fixed-cadence telemetry loop
//!
//! ## One tick
//!
//! ```text
//! ensure_connected ─→ counter.tick ─→ sensors.read ─→ validate
//!   (may block)                                          │
//!                        publish ←─ compose + sign ←─────┘
//! ```
//!
//! ## Timing
//!
//! The scheduler never sleeps on its own: it asks a [`TimeSource`] for the
//! time and a [`Delay`] to wait. Ticks are due on a fixed grid
//! (`first_tick + k * cadence`). When a tick overruns (a long reconnect),
//! the missed grid points are skipped rather than replayed, so at most one
//! record is published per tick and there is never a burst after an outage.
//!
//! With a [`SimulatedClock`](crate::time::SimulatedClock) as both clock and
//! delay, a test can run a day of ticks instantly and deterministically.

use crate::auth::Signature;
use crate::cancel::CancelToken;
use crate::connectivity::ConnectivityManager;
use crate::constants::PUBLISH_INTERVAL_MS;
use crate::errors::{TelemetryError, TelemetryResult};
use crate::health::HealthCounter;
use crate::record::TelemetryComposer;
use crate::time::{elapsed_ms, Delay, TimeSource, Timestamp};
use crate::traits::{PublishChannel, RecordEncoder, SensorSource};

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Interval between ticks (ms)
    pub publish_interval_ms: u64,
}

impl SchedulerConfig {
    pub const fn new(publish_interval_ms: u64) -> Self {
        Self { publish_interval_ms }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(PUBLISH_INTERVAL_MS)
    }
}

/// What happened to the record of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Record signed and handed to the channel
    Published {
        health_events: u8,
        signature: Signature,
    },
    /// Record dropped; best-effort delivery, no retry
    Dropped(TelemetryError),
}

impl TickOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Scheduler statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub published: u64,
    pub dropped: u64,
    /// Grid points skipped because a tick overran
    pub skipped: u64,
}

/// Drives the node: one signed record per cadence interval
pub struct TelemetryScheduler<'a, S, C, E, T, D>
where
    S: SensorSource,
    C: PublishChannel,
    E: RecordEncoder,
    T: TimeSource,
    D: Delay,
{
    counter: &'a HealthCounter,
    composer: TelemetryComposer<'a>,
    sensors: S,
    link: ConnectivityManager<C>,
    encoder: E,
    clock: T,
    delay: D,
    config: SchedulerConfig,
    next_due: Option<Timestamp>,
    stats: SchedulerStats,
}

impl<'a, S, C, E, T, D> TelemetryScheduler<'a, S, C, E, T, D>
where
    S: SensorSource,
    C: PublishChannel,
    E: RecordEncoder,
    T: TimeSource,
    D: Delay,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        counter: &'a HealthCounter,
        composer: TelemetryComposer<'a>,
        sensors: S,
        link: ConnectivityManager<C>,
        encoder: E,
        clock: T,
        delay: D,
    ) -> Self {
        Self {
            counter,
            composer,
            sensors,
            link,
            encoder,
            clock,
            delay,
            config: SchedulerConfig::default(),
            next_due: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Set the cadence
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one full tick now, regardless of the grid
    ///
    /// Only cancellation is an `Err`; every other failure drops this tick's
    /// record and is reported as [`TickOutcome::Dropped`].
    pub fn run_once(&mut self, cancel: &CancelToken) -> TelemetryResult<TickOutcome> {
        let outcome = match self.link.ensure_connected(&mut self.delay, cancel) {
            Err(TelemetryError::Cancelled) => return Err(TelemetryError::Cancelled),
            Err(e) => TickOutcome::Dropped(e),
            Ok(_) => self.publish_reading(),
        };

        self.stats.ticks += 1;
        match outcome {
            TickOutcome::Published { .. } => self.stats.published += 1,
            TickOutcome::Dropped(e) => {
                self.stats.dropped += 1;
                log_warn!("tick {}: record dropped: {}", self.stats.ticks, e);
            }
        }
        Ok(outcome)
    }

    fn publish_reading(&mut self) -> TickOutcome {
        let now = self.clock.now();
        self.counter.tick(now);

        let reading = self.sensors.read();
        if let Err(e) = reading.validate() {
            return TickOutcome::Dropped(e);
        }

        let health_events = self.counter.snapshot();
        let record = self.composer.compose_with_clock(reading, health_events, &self.clock);

        match self.link.publish(&record, &mut self.encoder) {
            Ok(()) => TickOutcome::Published {
                health_events,
                signature: *record.signature(),
            },
            Err(e) => TickOutcome::Dropped(e),
        }
    }

    /// Run a tick if one is due
    ///
    /// The first call always runs. Returns `Ok(None)` when the next grid
    /// point is still in the future.
    pub fn poll(&mut self, cancel: &CancelToken) -> TelemetryResult<Option<TickOutcome>> {
        let now = self.clock.now();
        let due = self.next_due.unwrap_or(now);
        if now < due {
            return Ok(None);
        }

        let outcome = self.run_once(cancel)?;
        self.schedule_after(due);
        Ok(Some(outcome))
    }

    fn schedule_after(&mut self, due: Timestamp) {
        let cadence = self.config.publish_interval_ms.max(1);
        let now = self.clock.now();
        let mut next = due.saturating_add(cadence);

        if next <= now {
            let missed = (now - next) / cadence + 1;
            next = next.saturating_add(missed * cadence);
            self.stats.skipped += missed;
            log_warn!("tick overran; skipping {} publish slot(s)", missed);
        }
        self.next_due = Some(next);
    }

    /// Milliseconds until the next tick is due (0 if due now)
    pub fn until_next_due(&self) -> u64 {
        self.next_due
            .map(|due| elapsed_ms(self.clock.now(), due))
            .unwrap_or(0)
    }

    /// Loop forever: tick, then wait for the next grid point
    ///
    /// Returns only once `cancel` is set.
    pub fn run(&mut self, cancel: &CancelToken) -> SchedulerStats {
        self.run_until(cancel, None)
    }

    /// Like [`run`](Self::run) but stop after `ticks` ticks
    pub fn run_ticks(&mut self, ticks: u64, cancel: &CancelToken) -> SchedulerStats {
        self.run_until(cancel, Some(ticks))
    }

    fn run_until(&mut self, cancel: &CancelToken, limit: Option<u64>) -> SchedulerStats {
        let start = self.stats.ticks;
        log_info!(
            "telemetry loop started: every {} ms on {}",
            self.config.publish_interval_ms,
            self.link.topic()
        );

        while !cancel.is_cancelled() {
            if limit.is_some_and(|n| self.stats.ticks - start >= n) {
                break;
            }

            if let Err(TelemetryError::Cancelled) = self.poll(cancel) {
                break;
            }

            if limit.is_some_and(|n| self.stats.ticks - start >= n) {
                break;
            }

            let wait = self.until_next_due();
            if wait > 0 && !cancel.is_cancelled() {
                self.delay.delay_ms(wait);
            }
        }

        log_info!(
            "telemetry loop stopped after {} ticks ({} published, {} dropped)",
            self.stats.ticks,
            self.stats.published,
            self.stats.dropped
        );
        self.stats
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn link(&self) -> &ConnectivityManager<C> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut ConnectivityManager<C> {
        &mut self.link
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.next_due
    }
}
