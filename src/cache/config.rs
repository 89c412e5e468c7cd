//! Cache configuration.
//!
//! Controls the documentation response cache via the `[cache]` section.

use std::num::NonZeroUsize;

pub(crate) const DEFAULT_NAMESPACE: &str = "/static/docs/";
pub(crate) const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;
pub(crate) const DEFAULT_STORE_CAPACITY: usize = 1024;

/// Cache configuration resolved from settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Enable capture and short-circuit for the namespace.
    pub enabled: bool,
    /// Path segment whose resources may be cached.
    pub namespace: String,
    /// Largest payload (head + body) a single response may buffer.
    pub max_payload_bytes: usize,
    /// Maximum entries held by the in-memory store.
    pub store_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            store_capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Returns the store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn store_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.store_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
