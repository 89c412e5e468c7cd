//! HTTP surface: documentation routes behind the cache, invalidation, health.

mod middleware;

pub use middleware::RequestContext;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::cache::{CacheState, docs_cache_layer, invalidate_cache};
use crate::infra::origin::{DocsOrigin, serve_docs, serve_docs_index};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub cache: CacheState,
    pub origin: DocsOrigin,
}

impl RouterState {
    pub fn new(cache: CacheState, origin: DocsOrigin) -> Self {
        Self { cache, origin }
    }
}

impl FromRef<RouterState> for CacheState {
    fn from_ref(state: &RouterState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<RouterState> for DocsOrigin {
    fn from_ref(state: &RouterState) -> Self {
        state.origin.clone()
    }
}

/// Build the application router.
///
/// The documentation site is mounted at the cache namespace and wrapped by
/// the cache layer; the other routes bypass it.
pub fn build_router(state: RouterState) -> Router {
    let namespace = state.cache.config.namespace.clone();

    let docs_routes = Router::new()
        .route(&namespace, get(serve_docs_index))
        .route(&format!("{namespace}{{*path}}"), get(serve_docs))
        .layer(axum_middleware::from_fn_with_state(
            state.cache.clone(),
            docs_cache_layer,
        ));

    let service_routes = Router::new()
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/_health", get(health));

    docs_routes
        .merge(service_routes)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
