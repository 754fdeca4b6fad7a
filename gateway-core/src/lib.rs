//! # Payment Gateway Core
//!
//! Resilient routing of deposits and withdrawals across interchangeable
//! payment providers:
//! - Region-based, priority-ordered gateway selection with health tracking
//! - Circuit breaker per gateway
//! - Exponential-backoff retry for downstream notifications
//! - Transaction state machine (pending → processing → completed/failed)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │             Transaction Orchestrator                │
//! └────┬──────────────┬──────────────┬──────────────┬───┘
//!      │              │              │              │
//! ┌────▼─────┐ ┌──────▼──────┐ ┌─────▼─────┐ ┌──────▼───────┐
//! │ Gateway  │ │  Circuit    │ │Transaction│ │ Notification │
//! │ Selector │ │  Breakers   │ │   Store   │ │ (retry+NATS) │
//! └────┬─────┘ └──────┬──────┘ └───────────┘ └──────────────┘
//!      │              │
//! ┌────▼──────────────▼─────────────────────────────────┐
//! │   Payment Providers (simulated / HTTP, JSON / XML)  │
//! └─────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod circuit_breaker;
pub mod codec;
pub mod config;
pub mod error;
#[allow(missing_docs)]
pub mod metrics;
pub mod notification;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod selector;
pub mod store;
pub mod types;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerManager, CircuitState};
pub use codec::DataFormat;
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use notification::{LogNotifier, NatsNotifier, NotificationChannel};
pub use orchestrator::TransactionOrchestrator;
pub use provider::PaymentProvider;
pub use retry::{retry, RetryPolicy};
pub use selector::GatewaySelector;
pub use store::{MemoryStore, TransactionStore};
pub use types::*;

/// Default notification publish attempts
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default minimum outcomes before a breaker may trip
pub const DEFAULT_CB_MIN_REQUESTS: u32 = 5;

/// Default failure ratio that trips a breaker
pub const DEFAULT_CB_FAILURE_RATIO: f64 = 0.5;

/// Default breaker cool-down (seconds before half-open)
pub const DEFAULT_CB_OPEN_TIMEOUT_SECONDS: u64 = 60;

/// Default provider request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
