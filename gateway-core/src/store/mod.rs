//! Persistence port
//!
//! The store is the system of record for users, gateway priorities and
//! transactions. Implementations must be linearizable per record.

pub mod memory;

use crate::types::{
    GatewayPriority, RegionId, Transaction, TransactionId, TransactionStatus, User, UserId,
};
use crate::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;

/// Transaction store trait
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Look up a user
    async fn get_user(&self, user_id: UserId) -> Result<User>;

    /// Gateways enabled for a region, with their priority ranks
    async fn gateways_by_priority(&self, region_id: RegionId) -> Result<Vec<GatewayPriority>>;

    /// Insert a transaction and return its generated ID
    async fn create_transaction(&self, transaction: &Transaction) -> Result<TransactionId>;

    /// Fetch a transaction
    async fn get_transaction(&self, transaction_id: TransactionId) -> Result<Option<Transaction>>;

    /// Overwrite status and error detail. Fails with `TransactionNotFound`
    /// for unknown IDs.
    async fn update_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Set the provider reference
    async fn update_transaction_reference(
        &self,
        transaction_id: TransactionId,
        reference_id: &str,
    ) -> Result<()>;

    /// Liveness probe
    async fn ping(&self) -> Result<()>;
}
