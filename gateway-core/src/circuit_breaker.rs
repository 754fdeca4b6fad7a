//! Circuit breaker per gateway
//!
//! Failure-ratio breaker with a fixed counting window:
//!
//! - **Closed**: outcomes are counted; the counters reset whenever the window
//!   (`interval_secs`) expires. Trips once `requests >= min_requests` and
//!   `failures / requests >= failure_ratio`.
//! - **Open**: calls are rejected with [`Error::CircuitOpen`] until
//!   `open_timeout_secs` has elapsed.
//! - **Half-open**: up to `half_open_max_requests` trial calls may be in
//!   flight. The breaker closes after `half_open_max_requests` consecutive
//!   successes; any failure reopens it.
//!
//! Every transition starts a new generation. Outcomes of calls admitted under
//! an older generation are discarded.

use crate::metrics::CIRCUIT_BREAKER_STATE;
use crate::types::ProviderId;
use crate::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Closed (normal operation)
    Closed,
    /// Open (rejecting requests)
    Open,
    /// Half-open (testing)
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Minimum outcomes in the window before the breaker may trip
    pub min_requests: u32,
    /// Failure ratio (0.0..=1.0) that trips the breaker
    pub failure_ratio: f64,
    /// Counting window in seconds (0 = never reset while closed)
    pub interval_secs: u64,
    /// Seconds spent open before half-opening
    pub open_timeout_secs: u64,
    /// Half-open trial cap; also the run of successes needed to close
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: crate::DEFAULT_CB_MIN_REQUESTS,
            failure_ratio: crate::DEFAULT_CB_FAILURE_RATIO,
            interval_secs: 30,
            open_timeout_secs: crate::DEFAULT_CB_OPEN_TIMEOUT_SECONDS,
            half_open_max_requests: 5,
        }
    }
}

impl CircuitBreakerConfig {
    /// Counting window
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Cool-down before half-open
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    fn should_trip(&self, counts: &Counts) -> bool {
        counts.requests >= self.min_requests
            && counts.requests > 0
            && f64::from(counts.failures) / f64::from(counts.requests) >= self.failure_ratio
    }
}

/// Outcome counters for the current generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Recorded outcomes
    pub requests: u32,
    /// Successful outcomes
    pub successes: u32,
    /// Failed outcomes
    pub failures: u32,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    /// Half-open trials currently running
    in_flight: u32,
    /// End of the counting window (closed) or of the cool-down (open)
    expiry: Option<Instant>,
}

/// Circuit breaker for a single gateway
#[derive(Debug)]
pub struct CircuitBreaker {
    gateway_id: ProviderId,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

/// Admission ticket for one call; releases the half-open slot on drop
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial {
            let mut inner = self.breaker.inner.lock();
            if inner.generation == self.generation {
                inner.in_flight = inner.in_flight.saturating_sub(1);
            }
        }
    }
}

impl CircuitBreaker {
    /// Create new circuit breaker
    pub fn new(gateway_id: ProviderId, config: CircuitBreakerConfig) -> Self {
        let now = Instant::now();
        let expiry = (config.interval_secs > 0).then(|| now + config.interval());
        Self {
            gateway_id,
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                in_flight: 0,
                expiry,
            }),
        }
    }

    /// Gateway this breaker guards
    pub fn gateway_id(&self) -> &ProviderId {
        &self.gateway_id
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Counters of the current generation
    pub fn counts(&self) -> Counts {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, Instant::now());
        inner.counts
    }

    /// Run one attempt of `operation` through the breaker.
    ///
    /// The operation is not invoked when the breaker rejects the call.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.acquire()?;
        let result = operation().await;
        self.record(permit.generation, result.is_ok());
        drop(permit);
        result
    }

    fn acquire(&self) -> Result<Permit<'_>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, now);

        match inner.state {
            CircuitState::Closed => Ok(Permit {
                breaker: self,
                generation: inner.generation,
                trial: false,
            }),
            CircuitState::Open => {
                let remaining = inner
                    .expiry
                    .map(|expiry| expiry.saturating_duration_since(now))
                    .unwrap_or_default();
                Err(Error::CircuitOpen {
                    gateway_id: self.gateway_id.clone(),
                    reason: format!("circuit open, retry in {}s", remaining.as_secs()),
                })
            }
            CircuitState::HalfOpen => {
                if inner.in_flight >= self.config.half_open_max_requests {
                    return Err(Error::CircuitOpen {
                        gateway_id: self.gateway_id.clone(),
                        reason: "too many half-open trial requests".to_string(),
                    });
                }
                inner.in_flight += 1;
                Ok(Permit {
                    breaker: self,
                    generation: inner.generation,
                    trial: true,
                })
            }
        }
    }

    fn record(&self, generation: u64, success: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, now);

        if inner.generation != generation {
            debug!(
                gateway_id = %self.gateway_id,
                success,
                "Discarding outcome from previous breaker generation"
            );
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.counts.requests += 1;
                if success {
                    inner.counts.successes += 1;
                } else {
                    inner.counts.failures += 1;
                    if self.config.should_trip(&inner.counts) {
                        warn!(
                            gateway_id = %self.gateway_id,
                            requests = inner.counts.requests,
                            failures = inner.counts.failures,
                            "Circuit breaker opening"
                        );
                        self.transition(&mut inner, CircuitState::Open, now);
                    }
                }
            }
            CircuitState::HalfOpen => {
                if success {
                    inner.counts.requests += 1;
                    inner.counts.successes += 1;
                    if inner.counts.successes >= self.config.half_open_max_requests {
                        info!(gateway_id = %self.gateway_id, "Circuit breaker closing");
                        self.transition(&mut inner, CircuitState::Closed, now);
                    }
                } else {
                    warn!(gateway_id = %self.gateway_id, "Circuit breaker re-opening");
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Apply time-driven transitions
    fn refresh(&self, inner: &mut BreakerState, now: Instant) {
        let expired = inner.expiry.map_or(false, |expiry| expiry <= now);
        if !expired {
            return;
        }
        match inner.state {
            CircuitState::Closed => self.new_generation(inner, now),
            CircuitState::Open => {
                info!(gateway_id = %self.gateway_id, "Circuit breaker half-opening");
                self.transition(inner, CircuitState::HalfOpen, now);
            }
            CircuitState::HalfOpen => {}
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        if inner.state == to {
            return;
        }
        inner.state = to;
        self.new_generation(inner, now);
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[self.gateway_id.as_str()])
            .set(to.gauge_value());
    }

    fn new_generation(&self, inner: &mut BreakerState, now: Instant) {
        inner.generation += 1;
        inner.counts = Counts::default();
        inner.in_flight = 0;
        inner.expiry = match inner.state {
            CircuitState::Closed => {
                (self.config.interval_secs > 0).then(|| now + self.config.interval())
            }
            CircuitState::Open => Some(now + self.config.open_timeout()),
            CircuitState::HalfOpen => None,
        };
    }
}

/// Circuit breaker manager (per gateway)
pub struct CircuitBreakerManager {
    /// Circuit breakers by gateway ID, created on first use
    breakers: RwLock<HashMap<ProviderId, Arc<CircuitBreaker>>>,
    /// Config applied to every breaker
    config: CircuitBreakerConfig,
}

impl CircuitBreakerManager {
    /// Create new manager
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get or create the breaker for a gateway
    pub async fn breaker(&self, gateway_id: &ProviderId) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(gateway_id) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write().await;
        breakers
            .entry(gateway_id.clone())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    gateway_id.clone(),
                    self.config.clone(),
                ))
            })
            .clone()
    }

    /// Run one attempt of `operation` through the gateway's breaker
    pub async fn execute<T, F, Fut>(&self, gateway_id: &ProviderId, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker = self.breaker(gateway_id).await;
        breaker.execute(operation).await
    }

    /// Get state for gateway (closed if never used)
    pub async fn state(&self, gateway_id: &ProviderId) -> CircuitState {
        let breaker = self.breakers.read().await.get(gateway_id).cloned();
        breaker.map_or(CircuitState::Closed, |breaker| breaker.state())
    }
}
