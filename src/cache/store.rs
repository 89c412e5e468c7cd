//! Cache storage boundary.
//!
//! The layer only talks to storage through [`CacheStore`]. [`MemoryStore`] is
//! the bundled implementation: a bounded LRU kept in process memory.

use std::sync::{LockResult, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::warn;

use super::config::CacheConfig;
use super::keys::CacheKey;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT_TOTAL: &str = "docs_cache_evict_total";

/// Key/value storage for captured payloads.
///
/// Implementations provide per-key atomicity for `set` and
/// `invalidate_many`; the layer never locks around them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheStoreError>;

    async fn set(&self, key: &CacheKey, payload: Bytes) -> Result<(), CacheStoreError>;

    /// Remove every key in `keys`, returning the ones that were invalidated.
    ///
    /// Keys the store cannot remove are reported through
    /// [`CacheStoreError::Invalidation`]; keys that were simply absent may be
    /// left out of the returned list without being treated as failures.
    async fn invalidate_many(&self, keys: &[CacheKey]) -> Result<Vec<CacheKey>, CacheStoreError>;
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
    #[error(transparent)]
    Invalidation(#[from] CacheInvalidationError),
}

impl CacheStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// A key the store refused to invalidate, with the store's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub key: CacheKey,
    pub reason: String,
}

/// Bulk invalidation failed for at least one key.
#[derive(Debug, Clone, Error)]
#[error(
    "failed to invalidate {} of {} cache entries",
    .rejections.len(),
    .rejections.len() + .invalidated.len()
)]
pub struct CacheInvalidationError {
    pub invalidated: Vec<CacheKey>,
    pub rejections: Vec<Rejection>,
}

impl CacheInvalidationError {
    pub fn new(invalidated: Vec<CacheKey>, rejections: Vec<Rejection>) -> Self {
        Self {
            invalidated,
            rejections,
        }
    }
}

/// In-process LRU store.
pub struct MemoryStore {
    entries: RwLock<LruCache<CacheKey, Bytes>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.store_capacity_non_zero())),
        }
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        recover(self.entries.read(), "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheStoreError> {
        // LRU promotion needs the write half.
        Ok(recover(self.entries.write(), "get").get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, payload: Bytes) -> Result<(), CacheStoreError> {
        let evicted = recover(self.entries.write(), "set").push(key.clone(), payload);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != *key
        {
            counter!(METRIC_CACHE_EVICT_TOTAL).increment(1);
        }
        Ok(())
    }

    async fn invalidate_many(&self, keys: &[CacheKey]) -> Result<Vec<CacheKey>, CacheStoreError> {
        let mut entries = recover(self.entries.write(), "invalidate_many");
        Ok(keys
            .iter()
            .filter(|key| entries.pop(*key).is_some())
            .cloned()
            .collect())
    }
}

fn recover<G>(result: LockResult<G>, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = SOURCE,
            result = "poisoned_recovered",
            hint = "entries may be stale after panic in another thread",
            "Recovered from poisoned store lock"
        );
        poisoned.into_inner()
    })
}
