use std::sync::Arc;

use crate::cache::{cache_order, OrderCache};
use crate::db::{OrderRepository, StoreError};
use crate::domain::order::Order;
use crate::metrics::Metrics;

// ============================================================================
// Order Lookup Service - cache-aside reads
// ============================================================================
//
//   cache hit  → serve from memory
//   cache miss → load from the store → populate cache → serve
//
// An order missing from the store leaves the cache untouched.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Cache,
    Store,
}

impl LookupSource {
    pub fn as_label(&self) -> &'static str {
        match self {
            LookupSource::Cache => "cache",
            LookupSource::Store => "store",
        }
    }
}

#[derive(Debug)]
pub struct Lookup {
    pub order: Arc<Order>,
    pub source: LookupSource,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Order ID is required")]
    MissingId,

    #[error("Order not found")]
    NotFound,

    #[error("failed to load order: {0}")]
    Store(#[from] StoreError),
}

pub struct OrderLookupService {
    cache: Arc<OrderCache>,
    repository: Arc<dyn OrderRepository>,
    metrics: Arc<Metrics>,
}

impl OrderLookupService {
    pub fn new(
        cache: Arc<OrderCache>,
        repository: Arc<dyn OrderRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cache,
            repository,
            metrics,
        }
    }

    pub async fn get_order(&self, order_uid: &str) -> Result<Lookup, LookupError> {
        if order_uid.is_empty() {
            return Err(LookupError::MissingId);
        }

        if let Some(order) = self.cache.get(order_uid) {
            self.metrics.record_cache_lookup(true);
            tracing::debug!(order_uid = %order_uid, "Order served from cache");
            return Ok(Lookup {
                order,
                source: LookupSource::Cache,
            });
        }
        self.metrics.record_cache_lookup(false);

        let order = match self.repository.find_order(order_uid).await? {
            Some(order) => Arc::new(order),
            None => {
                tracing::debug!(order_uid = %order_uid, "Order not found");
                return Err(LookupError::NotFound);
            }
        };

        cache_order(&self.cache, &self.metrics, order.clone());
        tracing::debug!(order_uid = %order_uid, "Order loaded from store and cached");

        Ok(Lookup {
            order,
            source: LookupSource::Store,
        })
    }

    /// Preload up to `limit` of the most recently stored orders. Oldest are
    /// inserted first so that the newest survive FIFO eviction.
    pub async fn warm_cache(&self, limit: i64) -> Result<usize, StoreError> {
        let mut orders = self.repository.recent_orders(limit).await?;
        orders.reverse();

        let count = orders.len();
        for order in orders {
            cache_order(&self.cache, &self.metrics, order);
        }

        tracing::info!(
            loaded = count,
            cache_size = self.cache.len(),
            "🔥 Cache warmed from store"
        );
        Ok(count)
    }

    pub async fn store_healthy(&self) -> bool {
        match self.repository.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        }
    }

    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }
}
