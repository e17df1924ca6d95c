// Private module declaration
mod bounded;

// Re-export for public API
pub use bounded::{BoundedCache, CacheError, CacheValue};

use crate::domain::order::Order;
use crate::metrics::Metrics;

pub type OrderCache = BoundedCache<Order>;

/// Best-effort cache write shared by ingestion and lookups. A rejected write
/// is logged and counted, never propagated.
pub fn cache_order(
    cache: &OrderCache,
    metrics: &Metrics,
    order: impl Into<std::sync::Arc<Order>>,
) {
    let order = order.into();
    let order_uid = order.order_uid.clone();

    match cache.set(order_uid.clone(), order) {
        Ok(evicted) => metrics.record_cache_write(evicted.is_some(), cache.len()),
        Err(e) => {
            metrics.cache_write_failures.inc();
            tracing::warn!(
                order_uid = %order_uid,
                error = %e,
                "Failed to add order to cache"
            );
        }
    }
}
