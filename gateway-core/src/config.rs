//! Core configuration

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings consumed by the orchestration core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-gateway breaker thresholds
    pub circuit_breaker: CircuitBreakerConfig,
    /// Notification publish retry
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Reject settings the breaker and retry executor cannot work with
    pub fn validate(&self) -> Result<()> {
        let cb = &self.circuit_breaker;
        if !(cb.failure_ratio > 0.0 && cb.failure_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "circuit_breaker.failure_ratio must be in (0, 1], got {}",
                cb.failure_ratio
            )));
        }
        if cb.min_requests == 0 {
            return Err(Error::Config(
                "circuit_breaker.min_requests must be positive".to_string(),
            ));
        }
        if cb.half_open_max_requests == 0 {
            return Err(Error::Config(
                "circuit_breaker.half_open_max_requests must be positive".to_string(),
            ));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be positive".to_string()));
        }
        if retry.jitter_min_ms > retry.jitter_max_ms {
            return Err(Error::Config(format!(
                "retry jitter range is empty: {}..{}ms",
                retry.jitter_min_ms, retry.jitter_max_ms
            )));
        }
        Ok(())
    }
}
