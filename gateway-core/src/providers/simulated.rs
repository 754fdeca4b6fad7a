//! Simulated payment gateway
//!
//! Stands in for a real provider in development: every call waits for a fixed
//! processing time and then succeeds with probability `success_rate`.

use crate::codec::{self, DataFormat};
use crate::provider::PaymentProvider;
use crate::types::{
    CallbackData, InboundRequest, ProviderId, ProviderResponse, Transaction, TransactionStatus,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Simulated gateway
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    id: ProviderId,
    name: String,
    data_format: DataFormat,
    /// Probability (0.0..=1.0) that a probe or call succeeds
    success_rate: f64,
    processing_time: Duration,
}

impl SimulatedProvider {
    /// Create new simulated gateway
    pub fn new(
        id: impl Into<ProviderId>,
        name: impl Into<String>,
        data_format: DataFormat,
        success_rate: f64,
        processing_time: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_format,
            success_rate: success_rate.clamp(0.0, 1.0),
            processing_time,
        }
    }

    /// The default gateway set: PayPal, Stripe and Adyen
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("1", "PayPal", DataFormat::Json, 0.95, Duration::from_millis(500)),
            Self::new("2", "Stripe", DataFormat::Json, 0.98, Duration::from_millis(300)),
            Self::new("3", "Adyen", DataFormat::Xml, 0.90, Duration::from_millis(800)),
        ]
    }

    fn roll(&self) -> bool {
        rand::thread_rng().gen::<f64>() < self.success_rate
    }

    fn reference(&self, transaction: &Transaction) -> String {
        format!("{}-{}-{}", self.name, transaction.id, Utc::now().timestamp())
    }
}

#[async_trait]
impl PaymentProvider for SimulatedProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn data_format(&self) -> DataFormat {
        self.data_format
    }

    async fn is_available(&self) -> bool {
        self.roll()
    }

    async fn process_deposit(&self, transaction: &Transaction) -> Result<ProviderResponse> {
        tokio::time::sleep(self.processing_time).await;
        if !self.roll() {
            return Err(Error::provider(
                &self.id,
                "deposit processing failed: gateway unavailable",
            ));
        }

        let reference = self.reference(transaction);
        debug!(gateway = %self.name, transaction_id = transaction.id, "Simulated deposit accepted");
        Ok(ProviderResponse {
            status: TransactionStatus::Processing,
            reference_id: None,
            redirect_url: Some(format!(
                "https://{}.example.com/payment/{}",
                self.name, reference
            )),
            message: Some("Transaction is being processed".to_string()),
        })
    }

    async fn process_withdrawal(&self, transaction: &Transaction) -> Result<ProviderResponse> {
        tokio::time::sleep(self.processing_time).await;
        if !self.roll() {
            return Err(Error::provider(
                &self.id,
                "withdrawal processing failed: gateway unavailable",
            ));
        }

        debug!(gateway = %self.name, transaction_id = transaction.id, "Simulated withdrawal accepted");
        Ok(ProviderResponse {
            status: TransactionStatus::Processing,
            reference_id: Some(self.reference(transaction)),
            redirect_url: None,
            message: Some("Withdrawal request is being processed".to_string()),
        })
    }

    fn parse_callback(&self, request: &InboundRequest) -> Result<CallbackData> {
        let format = request
            .format()
            .map_err(|e| Error::CallbackParse(e.to_string()))?;

        let mut callback: CallbackData = match format {
            DataFormat::Json => codec::decode(DataFormat::Json, &request.body)
                .map_err(|e| Error::CallbackParse(e.to_string()))?,
            DataFormat::Xml => {
                return Err(Error::CallbackParse(format!(
                    "{} does not send XML callbacks",
                    self.name
                )))
            }
        };

        callback.gateway_id = callback
            .gateway_id
            .filter(|id| !id.as_str().is_empty())
            .or_else(|| Some(self.id.clone()));
        if callback.timestamp.is_none() {
            callback.timestamp = Some(Utc::now());
        }
        Ok(callback)
    }
}
