use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::EngineError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), EngineError> {
    describe_metrics();

    let level: LevelFilter = logging.level.parse().map_err(|_| {
        EngineError::configuration(format!("invalid log level `{}`", logging.level))
    })?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
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
            EngineError::configuration(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "raffica_purge_dispatch_total",
            Unit::Count,
            "Total number of purge calls acknowledged by the gateway."
        );
        describe_counter!(
            "raffica_purge_failed_total",
            Unit::Count,
            "Total number of purge calls the gateway failed to execute."
        );
        describe_counter!(
            "raffica_purge_degraded_total",
            Unit::Count,
            "Total number of purges degraded to the entity key due to incomplete snapshots."
        );
        describe_histogram!(
            "raffica_purge_keys",
            Unit::Count,
            "Keys per computed purge set."
        );
        describe_histogram!(
            "raffica_gateway_request_ms",
            Unit::Milliseconds,
            "Edge-purge request latency in milliseconds."
        );
        describe_counter!(
            "raffica_response_tagged_total",
            Unit::Count,
            "Total number of responses tagged with a surrogate-key header."
        );
    });
}
