use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// Bounded Cache
// ============================================================================
//
// Thread-safe key/value store with a hard capacity ceiling.
//
// - Any number of concurrent readers, one writer at a time (RwLock)
// - On overflow exactly one entry is evicted: the oldest inserted (FIFO)
// - Lookups never mutate state; there is no recency and no time-based expiry
// - Values are stored behind `Arc` so a hit is a refcount bump, not a clone
//
// ============================================================================

/// Values the cache accepts. A nil value is refused by `set`.
pub trait CacheValue: Send + Sync {
    fn is_nil(&self) -> bool;
}

impl CacheValue for String {
    fn is_nil(&self) -> bool {
        self.is_empty()
    }
}

impl<T: CacheValue> CacheValue for Option<T> {
    fn is_nil(&self) -> bool {
        self.as_ref().map_or(true, CacheValue::is_nil)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache value can not be nil")]
    NilValue,

    #[error("cache key can not be empty")]
    EmptyKey,

    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
}

struct CacheState<V> {
    entries: HashMap<String, Arc<V>>,
    /// Keys in insertion order; front is the next eviction target.
    order: VecDeque<String>,
}

pub struct BoundedCache<V> {
    state: RwLock<CacheState<V>>,
    capacity: usize,
}

impl<V: CacheValue> BoundedCache<V> {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }

        Ok(Self {
            state: RwLock::new(CacheState {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
        })
    }

    /// Insert or overwrite `key`.
    ///
    /// Returns the key that was evicted to make room, if any. On error the
    /// cache is left untouched.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<V>>,
    ) -> Result<Option<String>, CacheError> {
        let value = value.into();
        if value.is_nil() {
            return Err(CacheError::NilValue);
        }
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let mut state = self.write();

        if let Some(slot) = state.entries.get_mut(&key) {
            *slot = value;
            return Ok(None);
        }

        let mut evicted = None;
        if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                tracing::debug!(order_uid = %oldest, "Evicted entry from cache");
                evicted = Some(oldest);
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(key, value);

        Ok(evicted)
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.read().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Every mutation completes before its guard drops, so a poisoned lock
    // still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, CacheState<V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState<V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> std::fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
