//! Out-of-band cache invalidation endpoint.
//!
//! `POST /cache/invalidate` with `{ "objects": [...] }` removes the listed
//! keys. Partial failures are summarized in the log only; the caller gets a
//! bare 500 and cannot tell which keys were rejected.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use docs_cache_api_types::InvalidateCacheRequest;
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::application::error::ErrorReport;

use super::{
    CacheState,
    keys::CacheKey,
    store::{CacheInvalidationError, CacheStoreError},
};

const SOURCE: &str = "cache::invalidate";
const METRIC_CACHE_INVALIDATED_TOTAL: &str = "docs_cache_invalidated_total";
const METRIC_CACHE_INVALIDATION_REJECTED_TOTAL: &str = "docs_cache_invalidation_rejected_total";

/// Condensed view of a failed bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionSummary {
    pub rejected: usize,
    /// Distinct reasons, in the order first seen.
    pub reasons: Vec<String>,
}

impl RejectionSummary {
    pub fn reasons_joined(&self) -> String {
        self.reasons.join(", ")
    }
}

impl From<&CacheInvalidationError> for RejectionSummary {
    fn from(error: &CacheInvalidationError) -> Self {
        let mut reasons: Vec<String> = Vec::new();
        for rejection in &error.rejections {
            if !reasons.contains(&rejection.reason) {
                reasons.push(rejection.reason.clone());
            }
        }
        Self {
            rejected: error.rejections.len(),
            reasons,
        }
    }
}

#[instrument(skip_all)]
pub async fn invalidate_cache(State(cache): State<CacheState>, body: Bytes) -> Response {
    let keys: Vec<CacheKey> = match serde_json::from_slice::<InvalidateCacheRequest>(&body) {
        Ok(request) if !request.is_empty() => {
            request.objects.into_iter().map(CacheKey::from).collect()
        }
        Ok(_) => return bad_request("objects must list at least one cache key"),
        Err(err) => return bad_request(format!("invalid invalidation body: {err}")),
    };

    debug!(
        count = keys.len(),
        first = %keys[0],
        "Clearing {} cache entries",
        keys.len()
    );

    match cache.store.invalidate_many(&keys).await {
        Ok(invalidated) => {
            counter!(METRIC_CACHE_INVALIDATED_TOTAL).increment(invalidated.len() as u64);
            debug!(
                invalidated = invalidated.len(),
                "Successfully invalidated {} cache entries",
                invalidated.len()
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(CacheStoreError::Invalidation(err)) => {
            let summary = RejectionSummary::from(&err);
            counter!(METRIC_CACHE_INVALIDATED_TOTAL).increment(err.invalidated.len() as u64);
            counter!(METRIC_CACHE_INVALIDATION_REJECTED_TOTAL).increment(summary.rejected as u64);
            warn!(
                rejected = summary.rejected,
                reasons = %summary.reasons_joined(),
                "Problem invalidating {} entries: {}",
                summary.rejected,
                summary.reasons_joined()
            );
            server_error(&err)
        }
        Err(err) => server_error(&err),
    }
}

fn bad_request(detail: impl Into<String>) -> Response {
    let mut response = StatusCode::BAD_REQUEST.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::BAD_REQUEST, detail).attach(&mut response);
    response
}

fn server_error(error: &dyn std::error::Error) -> Response {
    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, error).attach(&mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::Rejection;

    fn rejection(key: &str, reason: &str) -> Rejection {
        Rejection {
            key: CacheKey::new(key),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn summary_deduplicates_reasons_in_order() {
        let err = CacheInvalidationError::new(
            Vec::new(),
            vec![
                rejection("a", "timeout"),
                rejection("b", "access denied"),
                rejection("c", "timeout"),
            ],
        );

        let summary = RejectionSummary::from(&err);
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.reasons, vec!["timeout", "access denied"]);
        assert_eq!(summary.reasons_joined(), "timeout, access denied");
    }

    #[test]
    fn summary_counts_duplicate_keys_independently() {
        let err = CacheInvalidationError::new(
            Vec::new(),
            vec![rejection("a", "timeout"), rejection("a", "timeout")],
        );
        let summary = RejectionSummary::from(&err);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.reasons, vec!["timeout"]);
    }
}
