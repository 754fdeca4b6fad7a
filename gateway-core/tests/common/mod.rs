//! Shared fixtures for orchestration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use gateway_core::{
    CallbackData, CircuitBreakerConfig, CircuitBreakerManager, DataFormat, Error,
    GatewayPriority, GatewaySelector, InboundRequest, MemoryStore, NotificationChannel,
    PaymentProvider, ProviderId, ProviderResponse, RegionId, RetryPolicy, Transaction,
    TransactionId, TransactionOrchestrator, TransactionRequest, TransactionStatus,
    TransactionStore, User, UserId,
};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const USER_ID: i64 = 1;
pub const REGION_ID: i64 = 1;

/// Provider whose availability and outcome are set by the test
pub struct ScriptedProvider {
    id: ProviderId,
    name: String,
    format: DataFormat,
    available: AtomicBool,
    failing: AtomicBool,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(id: &str, name: &str, format: DataFormat) -> Self {
        Self {
            id: ProviderId::from(id),
            name: name.to_string(),
            format,
            available: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self) -> gateway_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::provider(&self.id, "declined by gateway"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn data_format(&self) -> DataFormat {
        self.format
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn process_deposit(&self, transaction: &Transaction) -> gateway_core::Result<ProviderResponse> {
        self.call().await?;
        Ok(ProviderResponse {
            status: TransactionStatus::Processing,
            reference_id: None,
            redirect_url: Some(format!("https://{}.test/pay/{}", self.name, transaction.id)),
            message: Some("accepted".to_string()),
        })
    }

    async fn process_withdrawal(
        &self,
        transaction: &Transaction,
    ) -> gateway_core::Result<ProviderResponse> {
        self.call().await?;
        Ok(ProviderResponse {
            status: TransactionStatus::Processing,
            reference_id: Some(format!("{}-W-{}", self.name, transaction.id)),
            redirect_url: None,
            message: None,
        })
    }

    fn parse_callback(&self, request: &InboundRequest) -> gateway_core::Result<CallbackData> {
        serde_json::from_slice(&request.body).map_err(|e| Error::CallbackParse(e.to_string()))
    }
}

/// Notifier that fails a set number of times, then records every publish
#[derive(Default)]
pub struct RecordingNotifier {
    failures_left: AtomicU32,
    attempts: AtomicU32,
    published: Mutex<Vec<(TransactionId, Bytes, DataFormat)>>,
    notify: Notify,
}

impl RecordingNotifier {
    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<(TransactionId, Bytes, DataFormat)> {
        self.published.lock().clone()
    }

    /// Wait until `count` messages were recorded
    pub async fn wait_for(&self, count: usize) {
        let wait = async {
            loop {
                if self.published.lock().len() >= count {
                    return;
                }
                self.notify.notified().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("notification was not published");
    }

    /// Wait until `count` publish attempts were made
    pub async fn wait_for_attempts(&self, count: u32) {
        let wait = async {
            while self.attempts() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("publish attempts not made");
    }
}

#[async_trait]
impl NotificationChannel for RecordingNotifier {
    async fn publish(
        &self,
        transaction_id: TransactionId,
        payload: Bytes,
        format: DataFormat,
    ) -> gateway_core::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::Notification("broker unavailable".to_string()));
        }

        self.published.lock().push((transaction_id, payload, format));
        self.notify.notify_one();
        Ok(())
    }
}

/// Store that reads through to a `MemoryStore` but cannot create transactions
pub struct CreateFailingStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl TransactionStore for CreateFailingStore {
    async fn get_user(&self, user_id: UserId) -> gateway_core::Result<User> {
        self.inner.get_user(user_id).await
    }

    async fn gateways_by_priority(
        &self,
        region_id: RegionId,
    ) -> gateway_core::Result<Vec<GatewayPriority>> {
        self.inner.gateways_by_priority(region_id).await
    }

    async fn create_transaction(&self, _transaction: &Transaction) -> gateway_core::Result<TransactionId> {
        Err(Error::Persistence("insert rejected".to_string()))
    }

    async fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> gateway_core::Result<Option<Transaction>> {
        self.inner.get_transaction(transaction_id).await
    }

    async fn update_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        error_message: Option<&str>,
    ) -> gateway_core::Result<()> {
        self.inner
            .update_transaction_status(transaction_id, status, error_message)
            .await
    }

    async fn update_transaction_reference(
        &self,
        transaction_id: TransactionId,
        reference_id: &str,
    ) -> gateway_core::Result<()> {
        self.inner
            .update_transaction_reference(transaction_id, reference_id)
            .await
    }

    async fn ping(&self) -> gateway_core::Result<()> {
        self.inner.ping().await
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub selector: Arc<GatewaySelector>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: TransactionOrchestrator,
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        jitter_min_ms: 0,
        jitter_max_ms: 1,
    }
}

/// One user in region 1, served by `providers` in the given priority order
pub async fn harness(
    providers: &[Arc<ScriptedProvider>],
    notifier: RecordingNotifier,
    breaker: CircuitBreakerConfig,
) -> Harness {
    build(providers, notifier, breaker, false).await
}

/// Same as [`harness`], but every transaction insert fails
pub async fn harness_failing_create(
    providers: &[Arc<ScriptedProvider>],
    notifier: RecordingNotifier,
) -> Harness {
    build(providers, notifier, CircuitBreakerConfig::default(), true).await
}

async fn build(
    providers: &[Arc<ScriptedProvider>],
    notifier: RecordingNotifier,
    breaker: CircuitBreakerConfig,
    fail_create: bool,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.add_user(User {
        id: USER_ID,
        username: "alice".to_string(),
        region_id: REGION_ID,
    });

    let selector = Arc::new(GatewaySelector::new(store.clone()));
    for (rank, provider) in providers.iter().enumerate() {
        store.add_gateway(
            REGION_ID,
            GatewayPriority {
                gateway_id: provider.id().clone(),
                name: provider.name().to_string(),
                priority: rank as i32 + 1,
                format: provider.data_format(),
            },
        );
        selector.register(provider.clone()).await;
    }

    let notifier = Arc::new(notifier);
    let backing: Arc<dyn TransactionStore> = if fail_create {
        Arc::new(CreateFailingStore {
            inner: store.clone(),
        })
    } else {
        store.clone()
    };
    let orchestrator = TransactionOrchestrator::new(
        backing,
        selector.clone(),
        Arc::new(CircuitBreakerManager::new(breaker)),
        notifier.clone(),
        fast_retry(),
    );

    Harness {
        store,
        selector,
        notifier,
        orchestrator,
    }
}

pub fn request() -> TransactionRequest {
    TransactionRequest {
        user_id: USER_ID,
        amount: dec!(100.00),
        currency: "USD".to_string(),
    }
}
