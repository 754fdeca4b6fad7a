//! Transaction orchestrator
//!
//! Drives a deposit/withdrawal from user lookup to the provider call and
//! publishes the accepted transaction downstream.
//!
//! ```text
//! request ─► user ─► select ─► pending ─► breaker(provider call) ─┬─► processing ─► notify (spawned)
//!                                                                 └─► mark down ─► failed
//! ```

use crate::circuit_breaker::CircuitBreakerManager;
use crate::codec::{self, DataFormat};
use crate::metrics::{GATEWAY_REQUESTS_TOTAL, GATEWAY_REQUEST_DURATION, NOTIFICATION_PUBLISH_TOTAL};
use crate::notification::NotificationChannel;
use crate::provider::PaymentProvider;
use crate::retry::{retry, RetryPolicy};
use crate::selector::GatewaySelector;
use crate::store::TransactionStore;
use crate::types::{
    CallbackData, ProviderResponse, Transaction, TransactionKind, TransactionRequest,
    TransactionResponse, TransactionStatus,
};
use crate::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Transaction orchestrator
pub struct TransactionOrchestrator {
    store: Arc<dyn TransactionStore>,
    selector: Arc<GatewaySelector>,
    breakers: Arc<CircuitBreakerManager>,
    notifier: Arc<dyn NotificationChannel>,
    /// Policy for the background notification publish
    notification_retry: RetryPolicy,
}

impl TransactionOrchestrator {
    /// Create new orchestrator
    pub fn new(
        store: Arc<dyn TransactionStore>,
        selector: Arc<GatewaySelector>,
        breakers: Arc<CircuitBreakerManager>,
        notifier: Arc<dyn NotificationChannel>,
        notification_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            selector,
            breakers,
            notifier,
            notification_retry,
        }
    }

    /// Gateway selector
    pub fn selector(&self) -> &Arc<GatewaySelector> {
        &self.selector
    }

    /// Circuit breakers
    pub fn breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    /// Deposit
    pub async fn deposit(
        &self,
        request: &TransactionRequest,
        cancel: &CancellationToken,
    ) -> Result<TransactionResponse> {
        self.initiate(request, TransactionKind::Deposit, cancel).await
    }

    /// Withdrawal
    pub async fn withdraw(
        &self,
        request: &TransactionRequest,
        cancel: &CancellationToken,
    ) -> Result<TransactionResponse> {
        self.initiate(request, TransactionKind::Withdrawal, cancel).await
    }

    /// Route a transaction to a provider.
    ///
    /// The provider is called exactly once. On failure the provider is marked
    /// down, the transaction is written as `failed` and the error is returned;
    /// the next request for the region falls through to the next provider.
    pub async fn initiate(
        &self,
        request: &TransactionRequest,
        kind: TransactionKind,
        cancel: &CancellationToken,
    ) -> Result<TransactionResponse> {
        let user = self
            .store
            .get_user(request.user_id)
            .await
            .map_err(|e| Error::UserNotFound {
                user_id: request.user_id,
                reason: e.to_string(),
            })?;

        let provider = self
            .selector
            .select(user.region_id, kind)
            .await
            .map_err(|e| Error::GatewaySelectionFailed(Box::new(e)))?;

        let mut transaction = Transaction::pending(request, kind, &user, provider.id().clone());
        transaction.id = self
            .store
            .create_transaction(&transaction)
            .await
            .map_err(into_persistence)?;

        info!(
            transaction_id = transaction.id,
            gateway_id = %provider.id(),
            kind = %kind,
            amount = %transaction.amount,
            currency = %transaction.currency,
            "Transaction created"
        );

        let gateway_id = provider.id().clone();
        let start = Instant::now();
        let result = self
            .breakers
            .execute(&gateway_id, || async {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::OperationCancelled {
                        gateway_id: gateway_id.clone(),
                    }),
                    result = call_provider(provider.as_ref(), kind, &transaction) => result,
                }
            })
            .await;

        GATEWAY_REQUEST_DURATION
            .with_label_values(&[gateway_id.as_str(), kind.as_str()])
            .observe(start.elapsed().as_secs_f64());
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[gateway_id.as_str(), kind.as_str(), outcome_label(&result)])
            .inc();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(
                    transaction_id = transaction.id,
                    gateway_id = %gateway_id,
                    "Gateway processing failed: {}",
                    e
                );
                self.selector.mark_down(&gateway_id).await;

                let message = e.to_string();
                if let Err(write_err) = self
                    .store
                    .update_transaction_status(
                        transaction.id,
                        TransactionStatus::Failed,
                        Some(&message),
                    )
                    .await
                {
                    error!(
                        transaction_id = transaction.id,
                        "Failed to mark transaction failed: {}", write_err
                    );
                }
                return Err(e);
            }
        };

        if let Some(reference) = response.reference() {
            match self
                .store
                .update_transaction_reference(transaction.id, reference)
                .await
            {
                Ok(()) => transaction.reference_id = Some(reference.to_string()),
                Err(e) => warn!(
                    transaction_id = transaction.id,
                    "Failed to store gateway reference: {}", e
                ),
            }
        }

        if let Err(e) = self
            .store
            .update_transaction_status(transaction.id, TransactionStatus::Processing, None)
            .await
        {
            error!(
                transaction_id = transaction.id,
                "Failed to mark transaction processing: {}", e
            );
        }
        transaction.status = TransactionStatus::Processing;

        info!(
            transaction_id = transaction.id,
            gateway_id = %gateway_id,
            "Transaction accepted by gateway"
        );

        let transaction_id = transaction.id;
        self.spawn_notification(transaction, provider.data_format());

        Ok(TransactionResponse {
            status: TransactionStatus::Processing,
            transaction_id,
            message: response.message,
            redirect_url: response.redirect_url.filter(|url| !url.is_empty()),
        })
    }

    /// Apply a provider callback.
    ///
    /// Any callback naming a gateway marks that gateway up, whatever status it
    /// reports.
    pub async fn handle_callback(&self, callback: &CallbackData) -> Result<()> {
        let error_message = match callback.status {
            TransactionStatus::Completed | TransactionStatus::Processing => None,
            _ => callback.message.as_deref(),
        };

        self.store
            .update_transaction_status(callback.transaction_id, callback.status, error_message)
            .await
            .map_err(|e| Error::TransactionUpdateFailed {
                transaction_id: callback.transaction_id,
                reason: e.to_string(),
            })?;

        if let Some(gateway_id) = &callback.gateway_id {
            self.selector.mark_up(gateway_id).await;
        }

        if let Some(reference) = callback.reference_id.as_deref().filter(|r| !r.is_empty()) {
            if let Err(e) = self
                .store
                .update_transaction_reference(callback.transaction_id, reference)
                .await
            {
                warn!(
                    transaction_id = callback.transaction_id,
                    "Failed to store callback reference: {}", e
                );
            }
        }

        info!(
            transaction_id = callback.transaction_id,
            status = %callback.status,
            gateway_id = ?callback.gateway_id.as_ref().map(|id| id.as_str()),
            "Callback applied"
        );
        Ok(())
    }

    /// Persistence liveness
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    fn spawn_notification(&self, transaction: Transaction, format: DataFormat) {
        let notifier = self.notifier.clone();
        let policy = self.notification_retry.clone();

        tokio::spawn(async move {
            let payload = match codec::encode(format, &transaction) {
                Ok(payload) => Bytes::from(payload),
                Err(e) => {
                    error!(
                        transaction_id = transaction.id,
                        "Failed to encode transaction notification: {}", e
                    );
                    NOTIFICATION_PUBLISH_TOTAL
                        .with_label_values(&["encode_error"])
                        .inc();
                    return;
                }
            };

            let result = retry(&policy, || {
                notifier.publish(transaction.id, payload.clone(), format)
            })
            .await;

            match result {
                Ok(()) => {
                    NOTIFICATION_PUBLISH_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                }
                Err(e) => {
                    error!(
                        transaction_id = transaction.id,
                        topic = format.topic(),
                        "Failed to publish transaction notification: {}", e
                    );
                    NOTIFICATION_PUBLISH_TOTAL
                        .with_label_values(&["failure"])
                        .inc();
                }
            }
        });
    }
}

async fn call_provider(
    provider: &dyn PaymentProvider,
    kind: TransactionKind,
    transaction: &Transaction,
) -> Result<ProviderResponse> {
    match kind {
        TransactionKind::Deposit => provider.process_deposit(transaction).await,
        TransactionKind::Withdrawal => provider.process_withdrawal(transaction).await,
    }
}

fn into_persistence(e: Error) -> Error {
    match e {
        Error::Persistence(_) => e,
        other => Error::Persistence(other.to_string()),
    }
}

fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::CircuitOpen { .. }) => "rejected",
        Err(Error::OperationCancelled { .. }) => "cancelled",
        Err(_) => "failure",
    }
}
