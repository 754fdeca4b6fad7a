//! In-memory transaction store
//!
//! Used by tests and by the service when no database is configured.

use super::TransactionStore;
use crate::codec::DataFormat;
use crate::types::{
    GatewayPriority, ProviderId, RegionId, Transaction, TransactionId, TransactionStatus, User,
    UserId,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    gateways_by_region: HashMap<RegionId, Vec<GatewayPriority>>,
    transactions: HashMap<TransactionId, Transaction>,
    next_transaction_id: TransactionId,
}

/// Memory-backed store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// When set, every call fails (simulates an outage)
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with three users (regions 1..=3) and the default gateway
    /// priorities: region 1 prefers PayPal, region 2 Stripe, region 3 Adyen.
    /// Mirrors the fixture in the service's seed migration.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        for (id, region_id) in [(1, 1), (2, 2), (3, 3)] {
            store.add_user(User {
                id,
                username: format!("user{}", id),
                region_id,
            });
        }

        let paypal = ("1", "PayPal", DataFormat::Json);
        let stripe = ("2", "Stripe", DataFormat::Json);
        let adyen = ("3", "Adyen", DataFormat::Xml);
        let orderings = [
            (1, [paypal, stripe, adyen]),
            (2, [stripe, paypal, adyen]),
            (3, [adyen, stripe, paypal]),
        ];
        for (region_id, gateways) in orderings {
            for (rank, (id, name, format)) in gateways.into_iter().enumerate() {
                store.add_gateway(
                    region_id,
                    GatewayPriority {
                        gateway_id: ProviderId::from(id),
                        name: name.to_string(),
                        priority: rank as i32 + 1,
                        format,
                    },
                );
            }
        }
        store
    }

    /// Insert or replace a user
    pub fn add_user(&self, user: User) {
        self.tables.write().users.insert(user.id, user);
    }

    /// Append a gateway to a region's priority list
    pub fn add_gateway(&self, region_id: RegionId, gateway: GatewayPriority) {
        self.tables
            .write()
            .gateways_by_region
            .entry(region_id)
            .or_default()
            .push(gateway);
    }

    /// Toggle simulated outage
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored transactions
    pub fn transaction_count(&self) -> usize {
        self.tables.read().transactions.len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Persistence("store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.check_online()?;
        self.tables
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::Persistence(format!("user {} does not exist", user_id)))
    }

    async fn gateways_by_priority(&self, region_id: RegionId) -> Result<Vec<GatewayPriority>> {
        self.check_online()?;
        let mut gateways = self
            .tables
            .read()
            .gateways_by_region
            .get(&region_id)
            .cloned()
            .unwrap_or_default();
        gateways.sort_by_key(|gateway| gateway.priority);
        Ok(gateways)
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<TransactionId> {
        self.check_online()?;
        let mut tables = self.tables.write();
        tables.next_transaction_id += 1;
        let id = tables.next_transaction_id;

        let mut stored = transaction.clone();
        stored.id = id;
        tables.transactions.insert(id, stored);
        Ok(id)
    }

    async fn get_transaction(&self, transaction_id: TransactionId) -> Result<Option<Transaction>> {
        self.check_online()?;
        Ok(self.tables.read().transactions.get(&transaction_id).cloned())
    }

    async fn update_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        self.check_online()?;
        let mut tables = self.tables.write();
        let transaction = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        transaction.status = status;
        transaction.error_message = error_message.map(str::to_string);
        transaction.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn update_transaction_reference(
        &self,
        transaction_id: TransactionId,
        reference_id: &str,
    ) -> Result<()> {
        self.check_online()?;
        let mut tables = self.tables.write();
        let transaction = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        transaction.reference_id = Some(reference_id.to_string());
        transaction.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionKind, TransactionRequest};
    use rust_decimal_macros::dec;

    fn pending(user: &User) -> Transaction {
        let request = TransactionRequest {
            user_id: user.id,
            amount: dec!(10.00),
            currency: "USD".to_string(),
        };
        Transaction::pending(&request, TransactionKind::Deposit, user, ProviderId::from("1"))
    }

    #[tokio::test]
    async fn test_sample_data_priorities() {
        let store = MemoryStore::with_sample_data();

        let user = store.get_user(2).await.unwrap();
        assert_eq!(user.region_id, 2);

        let gateways = store.gateways_by_priority(2).await.unwrap();
        let ids: Vec<_> = gateways.iter().map(|g| g.gateway_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        assert!(store.gateways_by_priority(99).await.unwrap().is_empty());
        assert!(store.get_user(99).await.is_err());
    }

    #[tokio::test]
    async fn test_transaction_lifecycle() {
        let store = MemoryStore::with_sample_data();
        let user = store.get_user(1).await.unwrap();

        let first = store.create_transaction(&pending(&user)).await.unwrap();
        let second = store.create_transaction(&pending(&user)).await.unwrap();
        assert_eq!((first, second), (1, 2));

        store
            .update_transaction_status(first, TransactionStatus::Failed, Some("declined"))
            .await
            .unwrap();
        store
            .update_transaction_reference(first, "REF-1")
            .await
            .unwrap();

        let stored = store.get_transaction(first).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("declined"));
        assert_eq!(stored.reference_id.as_deref(), Some("REF-1"));
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_transaction() {
        let store = MemoryStore::new();
        let err = store
            .update_transaction_status(42, TransactionStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionNotFound(42)));
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = MemoryStore::with_sample_data();
        store.set_offline(true);
        assert!(store.ping().await.is_err());
        assert!(store.get_user(1).await.is_err());
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
