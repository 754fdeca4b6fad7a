//! Shared types for the gateway core

use crate::codec::DataFormat;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier
pub type UserId = i64;

/// Region (country) identifier
pub type RegionId = i64;

/// Transaction identifier, assigned by the store
pub type TransactionId = i64;

/// Stable, opaque payment gateway identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new provider id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in
    Deposit,
    /// Money out
    Withdrawal,
}

impl TransactionKind {
    /// Wire/storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            other => Err(Error::InvalidRequest(format!(
                "unknown transaction type: {}",
                other
            ))),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded, provider not called yet
    Pending,
    /// Accepted by the provider, awaiting callback
    Processing,
    /// Confirmed by the provider
    Completed,
    /// Rejected or errored
    Failed,
}

impl TransactionStatus {
    /// Wire/storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    /// Completed or failed
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "processing" => Ok(TransactionStatus::Processing),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(Error::InvalidRequest(format!(
                "unknown transaction status: {}",
                other
            ))),
        }
    }
}

/// User record (only what routing needs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Username
    pub username: String,
    /// Region used for gateway selection
    pub region_id: RegionId,
}

/// Gateway entry in a region's priority list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPriority {
    /// Gateway ID
    pub gateway_id: ProviderId,
    /// Display name
    pub name: String,
    /// Priority rank (lower is tried first)
    pub priority: i32,
    /// Declared data format
    pub format: DataFormat,
}

/// Payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID (0 until persisted)
    pub id: TransactionId,
    /// Amount
    #[serde(deserialize_with = "crate::codec::deserialize_decimal")]
    pub amount: Decimal,
    /// Currency (ISO 4217)
    pub currency: String,
    /// Deposit or withdrawal
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Status
    pub status: TransactionStatus,
    /// Owning user
    pub user_id: UserId,
    /// Gateway the transaction was routed to
    pub gateway_id: ProviderId,
    /// Region resolved at initiation
    pub region_id: RegionId,
    /// Provider reference (redirect URL or external ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Error detail for failed transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Updated at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// New pending transaction for the given user and gateway
    pub fn pending(
        request: &TransactionRequest,
        kind: TransactionKind,
        user: &User,
        gateway_id: ProviderId,
    ) -> Self {
        Self {
            id: 0,
            amount: request.amount,
            currency: request.currency.clone(),
            kind,
            status: TransactionStatus::Pending,
            user_id: user.id,
            gateway_id,
            region_id: user.region_id,
            reference_id: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Inbound deposit/withdrawal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Requesting user
    pub user_id: UserId,
    /// Amount
    #[serde(deserialize_with = "crate::codec::deserialize_decimal")]
    pub amount: Decimal,
    /// Currency
    pub currency: String,
}

impl TransactionRequest {
    /// Basic input validation
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidRequest(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if self.user_id <= 0 {
            return Err(Error::InvalidRequest("Invalid user ID".to_string()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidRequest(format!(
                "Invalid currency code: {}",
                self.currency
            )));
        }
        Ok(())
    }
}

/// Response returned to the caller of deposit/withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Status at the time of the response
    pub status: TransactionStatus,
    /// Transaction ID
    pub transaction_id: TransactionId,
    /// Message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Where to send the user to complete the payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Result of a provider deposit/withdrawal call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Status reported by the provider
    pub status: TransactionStatus,
    /// Provider-side reference
    pub reference_id: Option<String>,
    /// Redirect URL for the payer
    pub redirect_url: Option<String>,
    /// Message
    pub message: Option<String>,
}

impl ProviderResponse {
    /// Value persisted as the transaction reference
    pub fn reference(&self) -> Option<&str> {
        self.reference_id
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.redirect_url.as_deref().filter(|value| !value.is_empty()))
    }
}

/// Callback payload extracted by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackData {
    /// Transaction ID
    pub transaction_id: TransactionId,
    /// Reported status
    pub status: TransactionStatus,
    /// Message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Provider reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Gateway that sent the callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<ProviderId>,
    /// Provider timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Transport-neutral inbound request handed to callback parsers
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Content-Type header, if any
    pub content_type: Option<String>,
    /// Raw body
    pub body: Bytes,
}

impl InboundRequest {
    /// Create new inbound request
    pub fn new(content_type: Option<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            body: body.into(),
        }
    }

    /// Wire format declared by the Content-Type header
    pub fn format(&self) -> Result<DataFormat> {
        DataFormat::from_content_type(self.content_type.as_deref())
    }
}

/// Health snapshot of a registered gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayHealth {
    /// Gateway ID
    pub gateway_id: ProviderId,
    /// Name
    pub name: String,
    /// Data format
    pub data_format: DataFormat,
    /// Health flag
    pub healthy: bool,
}
