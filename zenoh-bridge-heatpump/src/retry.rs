//! Bounded retry for bus exchanges under contention.
//!
//! A second master on the same RS-485 wire can hold the port or garble a
//! frame. Failed attempts are spaced by a short delay so the other master can
//! finish, and the final attempt gives up the exclusive lock: a possibly
//! interleaved frame beats a guaranteed failure.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::transport::TransportError;

/// Default pause between failed attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// All attempts of one exchange failed.
#[derive(Debug, Error)]
#[error("{attempts} attempt(s) failed, last error: {last}")]
pub struct AggregateError {
    pub attempts: u32,
    #[source]
    pub last: TransportError,
}

/// Per-attempt parameters handed to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Whether the exclusive port lock is requested.
    pub exclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A policy with at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy for block reads: 2 attempts.
    pub fn read() -> Self {
        Self::new(2, DEFAULT_RETRY_DELAY)
    }

    /// Policy for register writes: 3 attempts, a missed command is worse than a missed poll.
    pub fn write() -> Self {
        Self::new(3, DEFAULT_RETRY_DELAY)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `exchange` until it succeeds or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, mut exchange: F) -> Result<T, AggregateError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut number = 1;
        loop {
            let attempt = Attempt {
                number,
                exclusive: number < self.max_attempts,
            };

            match exchange(attempt).await {
                Ok(value) => return Ok(value),
                Err(last) if number >= self.max_attempts => {
                    return Err(AggregateError {
                        attempts: number,
                        last,
                    });
                }
                Err(e) => {
                    debug!(
                        attempt = number,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Exchange failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    number += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::read()
    }
}
