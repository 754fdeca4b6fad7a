//! Gateway registry and priority-based selection

use crate::metrics::GATEWAY_HEALTH;
use crate::provider::PaymentProvider;
use crate::store::TransactionStore;
use crate::types::{GatewayHealth, ProviderId, RegionId, TransactionKind};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Registry {
    providers: HashMap<ProviderId, Arc<dyn PaymentProvider>>,
    health: HashMap<ProviderId, bool>,
}

/// Gateway selector
///
/// Owns the set of registered providers and their health flags. Health is a
/// plain up/down bit with no history; the orchestrator flips it on provider
/// failures and callbacks.
pub struct GatewaySelector {
    /// Registered providers and health
    registry: RwLock<Registry>,
    /// Source of per-region priority lists
    store: Arc<dyn TransactionStore>,
}

impl GatewaySelector {
    /// Create new selector
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            store,
        }
    }

    /// Register (or replace) a provider and mark it healthy
    pub async fn register(&self, provider: Arc<dyn PaymentProvider>) {
        let id = provider.id().clone();
        let mut registry = self.registry.write().await;
        registry.health.insert(id.clone(), true);
        registry.providers.insert(id.clone(), provider);
        GATEWAY_HEALTH.with_label_values(&[id.as_str()]).set(1);
        info!(gateway_id = %id, "Registered payment gateway");
    }

    /// Mark provider unhealthy. Unknown IDs are ignored.
    pub async fn mark_down(&self, id: &ProviderId) {
        self.set_health(id, false).await;
    }

    /// Mark provider healthy. Unknown IDs are ignored.
    pub async fn mark_up(&self, id: &ProviderId) {
        self.set_health(id, true).await;
    }

    async fn set_health(&self, id: &ProviderId, healthy: bool) {
        let mut registry = self.registry.write().await;
        match registry.health.get_mut(id) {
            Some(flag) => {
                if *flag != healthy {
                    if healthy {
                        info!(gateway_id = %id, "Gateway marked up");
                    } else {
                        warn!(gateway_id = %id, "Gateway marked down");
                    }
                }
                *flag = healthy;
                GATEWAY_HEALTH
                    .with_label_values(&[id.as_str()])
                    .set(i64::from(healthy));
            }
            None => debug!(gateway_id = %id, "Ignoring health change for unknown gateway"),
        }
    }

    /// Current health flag, `None` for unknown providers
    pub async fn is_healthy(&self, id: &ProviderId) -> Option<bool> {
        self.registry.read().await.health.get(id).copied()
    }

    /// Look up a registered provider
    pub async fn get_by_id(&self, id: &ProviderId) -> Result<Arc<dyn PaymentProvider>> {
        self.registry
            .read()
            .await
            .providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::GatewayNotFound(id.clone()))
    }

    /// Pick the best provider for a region.
    ///
    /// Walks the region's priority list in ascending rank (ties keep store
    /// order), skipping unregistered and unhealthy entries, and returns the
    /// first provider whose availability probe passes. A failed probe does not
    /// change health.
    pub async fn select(
        &self,
        region_id: RegionId,
        kind: TransactionKind,
    ) -> Result<Arc<dyn PaymentProvider>> {
        let mut priorities = self
            .store
            .gateways_by_priority(region_id)
            .await
            .map_err(|e| Error::UpstreamLookupFailed {
                region_id,
                reason: e.to_string(),
            })?;

        if priorities.is_empty() {
            warn!(region_id, "No gateways configured for region");
            return Err(Error::NoAvailableGateway { region_id });
        }

        // Vec::sort_by_key is stable
        priorities.sort_by_key(|entry| entry.priority);

        let candidates: Vec<Arc<dyn PaymentProvider>> = {
            let registry = self.registry.read().await;
            priorities
                .iter()
                .filter_map(|entry| {
                    let Some(provider) = registry.providers.get(&entry.gateway_id) else {
                        warn!(
                            gateway_id = %entry.gateway_id,
                            region_id,
                            "Gateway in priority list is not registered"
                        );
                        return None;
                    };
                    if !registry.health.get(&entry.gateway_id).copied().unwrap_or(false) {
                        debug!(gateway_id = %entry.gateway_id, "Skipping unhealthy gateway");
                        return None;
                    }
                    Some(provider.clone())
                })
                .collect()
        };

        for provider in candidates {
            if provider.is_available().await {
                info!(
                    gateway_id = %provider.id(),
                    gateway = provider.name(),
                    region_id,
                    kind = %kind,
                    "Selected gateway"
                );
                return Ok(provider);
            }
            debug!(gateway_id = %provider.id(), "Gateway availability probe failed");
        }

        warn!(region_id, kind = %kind, "No available gateway");
        Err(Error::NoAvailableGateway { region_id })
    }

    /// Health listing of all registered providers, ordered by ID
    pub async fn snapshot(&self) -> Vec<GatewayHealth> {
        let registry = self.registry.read().await;
        let mut gateways: Vec<GatewayHealth> = registry
            .providers
            .values()
            .map(|provider| GatewayHealth {
                gateway_id: provider.id().clone(),
                name: provider.name().to_string(),
                data_format: provider.data_format(),
                healthy: registry.health.get(provider.id()).copied().unwrap_or(false),
            })
            .collect();
        gateways.sort_by(|a, b| a.gateway_id.cmp(&b.gateway_id));
        gateways
    }
}
