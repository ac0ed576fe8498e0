//! Connectivity manager: a logical connection to the broker
//!
//! ## State machine
//!
//! ```text
//!              connect() ok
//! Disconnected ──→ Connecting ──→ Connected
//!      ↑               │              │
//!      └── connect() ──┘              │ send() failed / link lost
//!          failed, wait delay         │
//!      ↑──────────────────────────────┘
//! ```
//!
//! ## Policies
//!
//! - **Reconnect**: `ensure_connected` blocks until a connect succeeds,
//!   waiting a fixed delay between attempts. The node has no other work
//!   while offline. The loop stops early only on cancellation or, when the
//!   policy sets one, after `max_attempts`.
//! - **Publish**: best-effort. A failed send drops the record and marks
//!   the link down; the next `ensure_connected` recovers. Health events are
//!   never lost by this: the counter is only read, the next record carries
//!   the same (or a larger) count.

use heapless::String;

use crate::cancel::CancelToken;
use crate::constants::device::{TOPIC_PREFIX, TOPIC_SUFFIX};
use crate::constants::RECONNECT_DELAY_MS;
use crate::errors::{TelemetryError, TelemetryResult};
use crate::record::SignedTelemetryRecord;
use crate::time::Delay;
use crate::traits::{PublishChannel, RecordEncoder};

/// Maximum topic length in bytes
pub const TOPIC_CAPACITY: usize = 64;

/// Publish topic
pub type Topic = String<TOPIC_CAPACITY>;

/// Build `sensors/<cohort>/encrypted`
pub fn topic_for_cohort(cohort: &str) -> TelemetryResult<Topic> {
    if cohort.is_empty() || cohort.contains(['/', '+', '#']) {
        return Err(TelemetryError::InvalidIdentity {
            reason: "cohort must be a single topic level",
        });
    }

    let mut topic = Topic::new();
    [TOPIC_PREFIX, "/", cohort, "/", TOPIC_SUFFIX]
        .iter()
        .try_for_each(|part| topic.push_str(part))
        .map_err(|_| TelemetryError::InvalidIdentity { reason: "topic longer than 64 bytes" })?;
    Ok(topic)
}

/// Externally observable connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

/// Reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay between attempts (ms)
    pub delay_ms: u64,
    /// Give up after this many attempts; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Unbounded retries with a fixed delay
    pub const fn fixed(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            max_attempts: None,
        }
    }

    /// Stop after `attempts` failed connects
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(RECONNECT_DELAY_MS)
    }
}

/// Connection statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Calls to `PublishChannel::connect`
    pub connect_attempts: u64,
    /// Failed connect calls
    pub connect_failures: u64,
    /// Successful connects after the first one
    pub reconnections: u32,
    /// Records handed to the channel successfully
    pub records_published: u64,
    /// Records dropped (not connected, encoding or send failure)
    pub records_failed: u64,
    /// Encoded bytes sent
    pub bytes_sent: u64,
}

/// Owns the channel and its connection state
pub struct ConnectivityManager<C: PublishChannel> {
    channel: C,
    topic: Topic,
    policy: RetryPolicy,
    state: ConnectionState,
    connected_once: bool,
    stats: ConnectionStats,
}

impl<C: PublishChannel> ConnectivityManager<C> {
    pub fn new(channel: C, topic: Topic) -> Self {
        Self {
            channel,
            topic,
            policy: RetryPolicy::default(),
            state: ConnectionState::Disconnected,
            connected_once: false,
            stats: ConnectionStats::default(),
        }
    }

    /// Set the reconnect policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connected in our state machine and the channel agrees
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.channel.is_connected()
    }

    /// Block until connected
    ///
    /// Returns the number of connect attempts made, 0 if the link was
    /// already up. Never retries after a success.
    pub fn ensure_connected<D: Delay>(
        &mut self,
        delay: &mut D,
        cancel: &CancelToken,
    ) -> TelemetryResult<u32> {
        if self.is_connected() {
            return Ok(0);
        }
        if self.state == ConnectionState::Connected {
            log_warn!("link to broker lost");
            self.state = ConnectionState::Disconnected;
        }

        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                self.state = ConnectionState::Disconnected;
                return Err(TelemetryError::Cancelled);
            }

            self.state = ConnectionState::Connecting;
            attempts += 1;
            self.stats.connect_attempts += 1;

            match self.channel.connect() {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    if self.connected_once {
                        self.stats.reconnections += 1;
                    }
                    self.connected_once = true;
                    log_info!("connected to broker after {} attempt(s)", attempts);
                    return Ok(attempts);
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    self.stats.connect_failures += 1;
                    log_warn!("connect attempt {} failed: {:?}", attempts, e);

                    if let Some(max) = self.policy.max_attempts {
                        if attempts >= max {
                            return Err(TelemetryError::ConnectionFailure { attempts });
                        }
                    }
                    if cancel.is_cancelled() {
                        return Err(TelemetryError::Cancelled);
                    }
                    delay.delay_ms(self.policy.delay_ms);
                }
            }
        }
    }

    /// Encode and send one record on the configured topic
    ///
    /// No internal retry. A send failure marks the link down.
    pub fn publish<E: RecordEncoder>(
        &mut self,
        record: &SignedTelemetryRecord,
        encoder: &mut E,
    ) -> TelemetryResult<()> {
        if !self.is_connected() {
            self.state = ConnectionState::Disconnected;
            self.stats.records_failed += 1;
            return Err(TelemetryError::PublishFailure);
        }

        let bytes = match encoder.encode(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                log_warn!("dropping record: encoding failed: {:?}", e);
                self.stats.records_failed += 1;
                return Err(TelemetryError::Encoding);
            }
        };

        match self.channel.send(&self.topic, bytes) {
            Ok(()) => {
                self.stats.records_published += 1;
                self.stats.bytes_sent += bytes.len() as u64;
                log_debug!("published {} bytes to {}", bytes.len(), self.topic.as_str());
                Ok(())
            }
            Err(e) => {
                log_warn!("dropping record: publish failed: {:?}", e);
                self.state = ConnectionState::Disconnected;
                self.stats.records_failed += 1;
                Err(TelemetryError::PublishFailure)
            }
        }
    }

    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
