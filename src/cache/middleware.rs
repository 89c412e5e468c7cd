//! Documentation response cache middleware.
//!
//! Serves cached payloads for the namespace and captures origin responses on
//! a miss. Requests outside the namespace are passed on untouched.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use http_body::Body as _;
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig, CacheStore,
    capture::CaptureBody,
    keys::{CacheKey, classify},
    payload::{CachedPayload, encode_head},
    session::{CaptureSession, DiscardReason},
};

const METRIC_CACHE_HIT_TOTAL: &str = "docs_cache_hit_total";
const METRIC_CACHE_MISS_TOTAL: &str = "docs_cache_miss_total";
const METRIC_CACHE_LOOKUP_ERROR_TOTAL: &str = "docs_cache_lookup_error_total";

/// Shared cache state for middleware and the invalidation endpoint.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<dyn CacheStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }
}

/// Middleware for the documentation response cache.
///
/// Only GET and HEAD requests in the namespace are considered. A hit is
/// answered from the store and the rest of the stack never runs; a miss
/// runs the stack and wraps a cacheable response body in [`CaptureBody`].
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn docs_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(key) = cacheable_key(&cache.config, &request) else {
        return next.run(request).await;
    };

    let mut session = CaptureSession::new(
        key.clone(),
        Arc::clone(&cache.store),
        cache.config.max_payload_bytes,
    );

    if let Some(cached) = lookup(&cache, &key).await {
        session.short_circuit();
        counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
        debug!(cache = "docs", key = %key, outcome = "hit", "serving cached response");
        return cached.into_response();
    }

    counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
    debug!(cache = "docs", key = %key, outcome = "miss", "cache miss, executing handler");

    // The key ignores headers, so a ranged answer must never be stored.
    let ranged = request.headers().contains_key(header::RANGE);
    let response = next.run(request).await;
    if ranged || !should_capture(&response) {
        session.discard(DiscardReason::NotCacheable);
        return response;
    }

    let (parts, body) = response.into_parts();
    if body.is_end_stream() {
        session.discard(DiscardReason::EmptyBody);
        return Response::from_parts(parts, body);
    }

    session.record(&encode_head(&parts));
    Response::from_parts(parts, Body::new(CaptureBody::new(body, session)))
}

/// Key for `request` when it may be served from or written to the cache.
fn cacheable_key(config: &CacheConfig, request: &Request<Body>) -> Option<CacheKey> {
    if !config.enabled {
        return None;
    }

    if request.method() != Method::GET && request.method() != Method::HEAD {
        return None;
    }

    // Upgraded connections leave the response body path entirely.
    if request.headers().contains_key(header::UPGRADE) {
        return None;
    }

    classify(&config.namespace, request.uri().path())
}

/// Look `key` up, degrading every failure to a miss.
async fn lookup(cache: &CacheState, key: &CacheKey) -> Option<CachedPayload> {
    let stored = match cache.store.get(key).await {
        Ok(stored) => stored?,
        Err(err) => {
            counter!(METRIC_CACHE_LOOKUP_ERROR_TOTAL).increment(1);
            warn!(key = %key, error = %err, "cache lookup failed, falling through to origin");
            return None;
        }
    };

    match CachedPayload::decode(stored) {
        Ok(payload) => Some(payload),
        Err(err) => {
            counter!(METRIC_CACHE_LOOKUP_ERROR_TOTAL).increment(1);
            warn!(key = %key, error = %err, "stored payload is unreadable, falling through to origin");
            None
        }
    }
}

fn should_capture(response: &Response) -> bool {
    let status = response.status();
    if !status.is_success() || status == StatusCode::PARTIAL_CONTENT {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    !response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}
