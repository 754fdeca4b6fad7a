//! Error types for the gateway core

use crate::types::{ProviderId, RegionId, TransactionId, UserId};
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// User lookup failed
    #[error("User {user_id} not found: {reason}")]
    UserNotFound {
        /// User ID
        user_id: UserId,
        /// Underlying lookup failure
        reason: String,
    },

    /// No registered, healthy and available gateway for the region
    #[error("No available gateway found for region {region_id}")]
    NoAvailableGateway {
        /// Region ID
        region_id: RegionId,
    },

    /// Priority list lookup failed
    #[error("Failed to get gateways for region {region_id}: {reason}")]
    UpstreamLookupFailed {
        /// Region ID
        region_id: RegionId,
        /// Reason
        reason: String,
    },

    /// Gateway not registered
    #[error("Provider with ID {0} not found")]
    GatewayNotFound(ProviderId),

    /// Circuit breaker open
    #[error("Circuit breaker open for gateway {gateway_id}: {reason}")]
    CircuitOpen {
        /// Gateway ID
        gateway_id: ProviderId,
        /// Reason
        reason: String,
    },

    /// Caller cancelled the provider call
    #[error("Operation cancelled on gateway {gateway_id}")]
    OperationCancelled {
        /// Gateway ID
        gateway_id: ProviderId,
    },

    /// Retry exhausted
    #[error("Retry exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts
        attempts: u32,
        /// Last error
        source: Box<Error>,
    },

    /// Store read/write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Transaction does not exist
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// Callback status update failed
    #[error("Failed to update transaction {transaction_id}: {reason}")]
    TransactionUpdateFailed {
        /// Transaction ID
        transaction_id: TransactionId,
        /// Reason
        reason: String,
    },

    /// Gateway selection failed during initiation
    #[error("Failed to select gateway: {0}")]
    GatewaySelectionFailed(#[source] Box<Error>),

    /// Provider call failed
    #[error("Gateway {gateway_id} processing failed: {message}")]
    Provider {
        /// Gateway ID
        gateway_id: ProviderId,
        /// Message
        message: String,
    },

    /// Bad client input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed callback
    #[error("Failed to parse callback: {0}")]
    CallbackParse(String),

    /// Notification publish failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Wire format encode/decode failure
    #[error("Codec error: {0}")]
    Codec(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Provider failure with message
    pub fn provider(gateway_id: &ProviderId, message: impl Into<String>) -> Self {
        Error::Provider {
            gateway_id: gateway_id.clone(),
            message: message.into(),
        }
    }

    /// Caused by the caller's input rather than by the system
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::InvalidRequest(_)
            | Error::UserNotFound { .. }
            | Error::CallbackParse(_)
            | Error::Codec(_)
            | Error::GatewayNotFound(_) => true,
            Error::GatewaySelectionFailed(source) => source.is_client_error(),
            _ => false,
        }
    }

    /// Innermost error, unwrapping selection and retry wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::GatewaySelectionFailed(source) | Error::RetriesExhausted { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}
