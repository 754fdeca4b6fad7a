//! REST payment gateway connector

use crate::codec::{self, DataFormat};
use crate::provider::PaymentProvider;
use crate::types::{
    CallbackData, InboundRequest, ProviderId, ProviderResponse, Transaction, TransactionKind,
    TransactionStatus,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    /// Gateway ID
    pub id: ProviderId,
    /// Display name
    pub name: String,
    /// Base URL, e.g. `https://api.psp.example.com/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Wire format the gateway speaks
    pub data_format: DataFormat,
    /// Request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    crate::DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// Health probes must be fast
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP gateway connector
pub struct HttpProvider {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpProvider {
    /// Create new HTTP connector
    pub fn new(config: HttpProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn submit(&self, kind: TransactionKind, transaction: &Transaction) -> Result<ProviderResponse> {
        let format = self.config.data_format;
        let path = match kind {
            TransactionKind::Deposit => "deposits",
            TransactionKind::Withdrawal => "withdrawals",
        };
        info!(
            gateway = %self.config.name,
            transaction_id = transaction.id,
            kind = %kind,
            "Submitting transaction to gateway"
        );

        let body = codec::encode(format, transaction)?;
        let response = self
            .client
            .post(self.endpoint(path))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", format.content_type())
            .header("Accept", format.content_type())
            .body(body)
            .send()
            .await
            .map_err(|e| Error::provider(&self.config.id, e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::provider(&self.config.id, e.to_string()))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes);
            warn!(gateway = %self.config.name, status = status.as_u16(), "Gateway rejected transaction");
            return Err(Error::provider(
                &self.config.id,
                format!("HTTP {}: {}", status.as_u16(), message),
            ));
        }

        if bytes.is_empty() {
            return Ok(ProviderResponse {
                status: TransactionStatus::Processing,
                reference_id: None,
                redirect_url: None,
                message: None,
            });
        }

        codec::decode(format, &bytes).map_err(|e| {
            Error::provider(&self.config.id, format!("unreadable gateway response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for HttpProvider {
    fn id(&self) -> &ProviderId {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn data_format(&self) -> DataFormat {
        self.config.data_format
    }

    async fn is_available(&self) -> bool {
        match self
            .client
            .get(self.endpoint("health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(gateway = %self.config.name, "Health probe failed: {}", e);
                false
            }
        }
    }

    async fn process_deposit(&self, transaction: &Transaction) -> Result<ProviderResponse> {
        self.submit(TransactionKind::Deposit, transaction).await
    }

    async fn process_withdrawal(&self, transaction: &Transaction) -> Result<ProviderResponse> {
        self.submit(TransactionKind::Withdrawal, transaction).await
    }

    fn parse_callback(&self, request: &InboundRequest) -> Result<CallbackData> {
        let format = request
            .format()
            .map_err(|e| Error::CallbackParse(e.to_string()))?;
        let mut callback: CallbackData = codec::decode(format, &request.body)
            .map_err(|e| Error::CallbackParse(e.to_string()))?;

        // empty id counts as absent
        callback.gateway_id = callback
            .gateway_id
            .filter(|id| !id.as_str().is_empty())
            .or_else(|| Some(self.config.id.clone()));
        if callback.timestamp.is_none() {
            callback.timestamp = Some(Utc::now());
        }
        Ok(callback)
    }
}
