//! Bounded retry with exponential backoff and jitter

use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay_ms: u64,
    /// Upper bound for the exponential part of the delay
    pub max_delay_ms: u64,
    /// Lower bound of the random jitter added to every delay
    pub jitter_min_ms: u64,
    /// Upper bound of the random jitter
    pub jitter_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::DEFAULT_RETRY_ATTEMPTS,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            jitter_min_ms: 50,
            jitter_max_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Same policy with a different attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Exponential part of the delay after failed attempt `attempt` (1-based):
    /// `min(max_delay, initial_delay * 2^(attempt-1))`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_delay_ms)
            .saturating_mul(factor)
            .min(Duration::from_millis(self.max_delay_ms))
    }

    fn jitter(&self) -> Duration {
        if self.jitter_max_ms <= self.jitter_min_ms {
            return Duration::from_millis(self.jitter_min_ms);
        }
        let millis = rand::thread_rng().gen_range(self.jitter_min_ms..=self.jitter_max_ms);
        Duration::from_millis(millis)
    }

    /// Full sleep after failed attempt `attempt`, jitter included
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + self.jitter()
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Fails with [`Error::RetriesExhausted`] carrying the last error. A policy
/// with `max_attempts == 0` still makes one attempt.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
