// Application wiring
// Builds the orchestrator from config and exposes the axum router

use axum::routing::{get, post};
use axum::Router;
use gateway_core::providers::SimulatedProvider;
use gateway_core::{
    CircuitBreakerManager, GatewaySelector, LogNotifier, MemoryStore, NatsNotifier,
    NotificationChannel, TransactionOrchestrator, TransactionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::db::PgStore;
use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TransactionOrchestrator>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the core around the given collaborators and register the
    /// simulated gateways
    pub async fn new(
        config: &Config,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        let gateway_config = config.gateway();
        let selector = Arc::new(GatewaySelector::new(store.clone()));
        for provider in SimulatedProvider::defaults() {
            selector.register(Arc::new(provider)).await;
        }
        let breakers = Arc::new(CircuitBreakerManager::new(gateway_config.circuit_breaker));

        let orchestrator = TransactionOrchestrator::new(
            store,
            selector,
            breakers,
            notifier,
            gateway_config.retry,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            request_timeout: config.request_timeout(),
        }
    }

    /// Connect the configured store and notifier
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn TransactionStore> = if config.database.use_memory {
            info!("Using in-memory transaction store with sample data");
            Arc::new(MemoryStore::with_sample_data())
        } else {
            info!("Connecting to database");
            let store = PgStore::connect(&config.database.url, config.database.max_connections)
                .await?;
            store.migrate().await?;
            Arc::new(store)
        };

        let notifier: Arc<dyn NotificationChannel> = if config.nats.enabled {
            Arc::new(NatsNotifier::connect(&config.nats.url).await?)
        } else {
            info!("NATS disabled, transaction notifications are logged only");
            Arc::new(LogNotifier)
        };

        Ok(Self::new(config, store, notifier).await)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/deposit", post(handlers::deposit))
        .route("/withdrawal", post(handlers::withdrawal))
        .route("/callback/:gateway_id", post(handlers::callback))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
