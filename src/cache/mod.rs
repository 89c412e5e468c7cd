//! Documentation response cache.
//!
//! Responses under the configured namespace (`/static/docs/` by default) are
//! captured as they stream to the client and stored whole once the transfer
//! finishes. Later requests for the same key are answered from the store
//! without reaching the origin.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! namespace = "/static/docs/"
//! max_payload_bytes = 8388608
//! store_capacity = 1024
//! ```
//!
//! Entries are only removed through `POST /cache/invalidate` or LRU
//! eviction; there is no expiry.

mod capture;
mod config;
mod invalidate;
mod keys;
mod middleware;
mod payload;
mod session;
mod store;

pub use capture::CaptureBody;
pub use config::CacheConfig;
pub use invalidate::{RejectionSummary, invalidate_cache};
pub use keys::{CacheKey, classify};
pub use middleware::{CacheState, docs_cache_layer};
pub use payload::{CachedPayload, PayloadError, encode_head};
pub use session::{CaptureSession, CaptureState, DiscardReason};
pub use store::{CacheInvalidationError, CacheStore, CacheStoreError, MemoryStore, Rejection};
