//! Payment provider interface

use crate::codec::DataFormat;
use crate::types::{CallbackData, InboundRequest, ProviderId, ProviderResponse, Transaction};
use crate::Result;
use async_trait::async_trait;

/// Payment provider trait
///
/// Every external gateway (PayPal, Stripe, Adyen, ...) is registered with the
/// selector as an `Arc<dyn PaymentProvider>`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Stable gateway identifier
    fn id(&self) -> &ProviderId;

    /// Get provider name
    fn name(&self) -> &str;

    /// Data format the gateway speaks
    fn data_format(&self) -> DataFormat;

    /// Point-in-time availability probe. Must be side-effect free.
    async fn is_available(&self) -> bool;

    /// Start a deposit
    async fn process_deposit(&self, transaction: &Transaction) -> Result<ProviderResponse>;

    /// Start a withdrawal
    async fn process_withdrawal(&self, transaction: &Transaction) -> Result<ProviderResponse>;

    /// Extract callback data from a raw inbound request
    fn parse_callback(&self, request: &InboundRequest) -> Result<CallbackData>;
}
