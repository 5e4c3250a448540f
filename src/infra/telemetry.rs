use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "score_api_cache_hit_total",
            Unit::Count,
            "Total number of score cache hits."
        );
        describe_counter!(
            "score_api_cache_miss_total",
            Unit::Count,
            "Total number of score cache misses, including undecodable entries."
        );
        describe_counter!(
            "score_api_cache_unavailable_total",
            Unit::Count,
            "Total number of score cache reads that failed to reach the store."
        );
        describe_counter!(
            "score_api_compute_failure_total",
            Unit::Count,
            "Total number of scorer invocations that produced no usable score."
        );
        describe_histogram!(
            "score_api_compute_ms",
            Unit::Milliseconds,
            "External scorer latency in milliseconds."
        );
    });
}
