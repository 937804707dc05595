//! Adaptive poll scheduler.
//!
//! Driven by an external tick whose interval is the *current* period. A
//! failed cycle inflates the period by one second plus a small random jitter
//! so two masters sharing the bus drift apart; the first successful cycle
//! restores the nominal period.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::registers::{PRIMARY_BLOCK, ReadBlock, SECONDARY_BLOCK};
use crate::registry::HostRegistry;
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Upper bound (inclusive) of the backoff jitter, in seconds.
pub const MAX_JITTER_SECS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
}

/// Scheduling state, owned by a single scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    nominal_period_secs: u64,
    current_period_secs: u64,
    elapsed_secs: u64,
    phase: Phase,
}

impl PollState {
    pub fn new(nominal_period_secs: u64) -> Self {
        Self {
            nominal_period_secs,
            current_period_secs: nominal_period_secs,
            elapsed_secs: 0,
            phase: Phase::Idle,
        }
    }

    pub fn nominal_period_secs(&self) -> u64 {
        self.nominal_period_secs
    }

    pub fn current_period_secs(&self) -> u64 {
        self.current_period_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Account one tick; returns `true` when a poll is due.
    pub fn on_tick(&mut self) -> bool {
        self.elapsed_secs += self.current_period_secs;
        if self.elapsed_secs < self.nominal_period_secs {
            return false;
        }
        self.elapsed_secs = 0;
        self.phase = Phase::Polling;
        true
    }

    /// Inflate the period after a failed cycle. Returns the new period.
    pub fn record_failure(&mut self, jitter_secs: u64) -> u64 {
        self.phase = Phase::Idle;
        self.current_period_secs = self.nominal_period_secs + 1 + jitter_secs;
        self.current_period_secs
    }

    /// Restore the nominal period after a good cycle.
    ///
    /// Returns the period to re-program, or `None` if it did not change.
    pub fn record_success(&mut self) -> Option<u64> {
        self.phase = Phase::Idle;
        if self.current_period_secs == self.nominal_period_secs {
            return None;
        }
        self.current_period_secs = self.nominal_period_secs;
        Some(self.current_period_secs)
    }
}

/// What one poll cycle achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Points whose update reached the registry.
    pub updated: Vec<&'static str>,
    /// Block whose read exhausted its attempts, if any.
    pub failed_block: Option<&'static str>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.failed_block.is_none()
    }
}

/// Result of handling one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub polled: bool,
    pub cycle: Option<CycleReport>,
    /// New timer period in seconds, when the timer must be re-programmed.
    pub reprogram: Option<u64>,
}

pub struct PollScheduler {
    state: PollState,
    read_policy: RetryPolicy,
    rng: SmallRng,
    debug: bool,
}

impl PollScheduler {
    pub fn new(nominal_period_secs: u64, read_policy: RetryPolicy) -> Self {
        Self {
            state: PollState::new(nominal_period_secs),
            read_policy,
            rng: SmallRng::from_os_rng(),
            debug: false,
        }
    }

    /// Use a fixed jitter source.
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    /// Log every decoded point at info level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Current tick interval.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.state.current_period_secs)
    }

    /// Handle one timer tick.
    pub async fn on_tick<T, R>(&mut self, transport: &T, registry: &R) -> TickOutcome
    where
        T: Transport,
        R: HostRegistry,
    {
        if !self.state.on_tick() {
            trace!(elapsed = self.state.elapsed_secs, "Poll not due");
            return TickOutcome::default();
        }

        let report = self.poll_cycle(transport, registry).await;

        let reprogram = if report.is_success() {
            let restored = self.state.record_success();
            if let Some(period) = restored {
                info!(period_secs = period, "Bus recovered, nominal poll period restored");
            }
            restored
        } else {
            let jitter = self.rng.random_range(0..=MAX_JITTER_SECS);
            let period = self.state.record_failure(jitter);
            warn!(
                block = report.failed_block.unwrap_or_default(),
                period_secs = period,
                "Poll cycle failed, backing off"
            );
            Some(period)
        };

        TickOutcome {
            polled: true,
            cycle: Some(report),
            reprogram,
        }
    }

    /// Primary block first; the secondary block only if the primary succeeded.
    async fn poll_cycle<T, R>(&self, transport: &T, registry: &R) -> CycleReport
    where
        T: Transport,
        R: HostRegistry,
    {
        let mut report = CycleReport::default();

        for block in [PRIMARY_BLOCK, SECONDARY_BLOCK] {
            let read = self
                .read_policy
                .run(move |attempt| transport.read_block(block.base, block.count, attempt.exclusive))
                .await;

            match read {
                Ok(values) => self.publish_block(&block, &values, registry, &mut report).await,
                Err(e) => {
                    warn!(block = block.name, base = block.base, error = %e, "Block read failed");
                    report.failed_block = Some(block.name);
                    break;
                }
            }
        }

        debug!(updated = report.updated.len(), ok = report.is_success(), "Poll cycle complete");
        report
    }

    async fn publish_block<R: HostRegistry>(
        &self,
        block: &ReadBlock,
        values: &[u16],
        registry: &R,
        report: &mut CycleReport,
    ) {
        for point in block.points() {
            let Some(raw) = block.value_at(values, point) else {
                continue;
            };
            let value = point.encoding.decode(raw);

            if self.debug {
                info!(point = point.name, raw, value = %value, "Decoded");
            } else {
                debug!(point = point.name, raw, value = %value, "Decoded");
            }

            match registry.update_point(point.name, value).await {
                Ok(()) => report.updated.push(point.name),
                Err(e) => warn!(point = point.name, error = %e, "Failed to update point"),
            }
        }
    }
}
