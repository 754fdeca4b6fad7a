//! Downstream transaction notifications

use crate::codec::DataFormat;
use crate::types::TransactionId;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

/// Header carrying the transaction ID on published messages
pub const TRANSACTION_ID_HEADER: &str = "Transaction-Id";

/// Notification channel trait
///
/// Delivery is at-least-once; consumers key on the transaction ID.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Publish an encoded transaction
    async fn publish(
        &self,
        transaction_id: TransactionId,
        payload: Bytes,
        format: DataFormat,
    ) -> Result<()>;
}

/// NATS-backed notifier. Publishes to the format's topic.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    /// Wrap a connected client
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Connect to a NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Notification(format!("NATS connect to {} failed: {}", url, e)))?;
        info!("Connected to NATS at {}", url);
        Ok(Self::new(client))
    }
}

#[async_trait]
impl NotificationChannel for NatsNotifier {
    async fn publish(
        &self,
        transaction_id: TransactionId,
        payload: Bytes,
        format: DataFormat,
    ) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Content-Type", format.content_type());
        headers.insert(TRANSACTION_ID_HEADER, transaction_id.to_string().as_str());

        self.client
            .publish_with_headers(format.topic(), headers, payload)
            .await
            .map_err(|e| Error::Notification(format!("publish failed: {}", e)))?;

        // publish only buffers; flush surfaces connection failures to the retry loop
        self.client
            .flush()
            .await
            .map_err(|e| Error::Notification(format!("flush failed: {}", e)))
    }
}

/// Notifier that only logs. Used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationChannel for LogNotifier {
    async fn publish(
        &self,
        transaction_id: TransactionId,
        payload: Bytes,
        format: DataFormat,
    ) -> Result<()> {
        info!(
            transaction_id,
            topic = format.topic(),
            bytes = payload.len(),
            "Transaction notification"
        );
        Ok(())
    }
}
