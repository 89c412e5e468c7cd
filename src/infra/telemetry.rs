use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG` refines the configured level; the configured level is only the
/// default directive.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for the cache counters with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "docs_cache_hit_total",
            Unit::Count,
            "Requests answered from the documentation cache."
        );
        describe_counter!(
            "docs_cache_miss_total",
            Unit::Count,
            "Cacheable requests forwarded to the origin."
        );
        describe_counter!(
            "docs_cache_lookup_error_total",
            Unit::Count,
            "Lookups that failed or returned an unreadable payload."
        );
        describe_counter!(
            "docs_cache_commit_total",
            Unit::Count,
            "Captured responses handed to the store."
        );
        describe_counter!(
            "docs_cache_commit_error_total",
            Unit::Count,
            "Captured responses the store failed to persist."
        );
        describe_counter!(
            "docs_cache_discard_total",
            Unit::Count,
            "Captures abandoned before commit, labelled by reason."
        );
        describe_counter!(
            "docs_cache_evict_total",
            Unit::Count,
            "Entries evicted from the in-memory store due to capacity."
        );
        describe_counter!(
            "docs_cache_invalidated_total",
            Unit::Count,
            "Entries removed through the invalidation endpoint."
        );
        describe_counter!(
            "docs_cache_invalidation_rejected_total",
            Unit::Count,
            "Keys the store refused to invalidate."
        );
    });
}
