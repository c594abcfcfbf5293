//! Tracing setup and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use serde::Deserialize;
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

pub const METRIC_READ_PRIMARY_TOTAL: &str = "scorta_read_primary_total";
pub const METRIC_READ_FALLBACK_TOTAL: &str = "scorta_read_fallback_total";
pub const METRIC_SNAPSHOT_PATCH_FAILURE_TOTAL: &str = "scorta_snapshot_patch_failure_total";
pub const METRIC_RESYNC_RUNS_TOTAL: &str = "scorta_resync_runs_total";
pub const METRIC_RESYNC_DURATION_MS: &str = "scorta_resync_duration_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

/// Install a global tracing subscriber. `RUST_LOG` overrides the default
/// directive.
pub fn init(default_directive: &str, format: LogFormat) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))?;

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_READ_PRIMARY_TOTAL,
            Unit::Count,
            "Reads answered by the primary data source within deadline."
        );
        describe_counter!(
            METRIC_READ_FALLBACK_TOTAL,
            Unit::Count,
            "Reads answered from the snapshot cache or store after a primary failure."
        );
        describe_counter!(
            METRIC_SNAPSHOT_PATCH_FAILURE_TOTAL,
            Unit::Count,
            "Write-through snapshot patches that failed and were left for resync."
        );
        describe_counter!(
            METRIC_RESYNC_RUNS_TOTAL,
            Unit::Count,
            "Background resync attempts, labeled by outcome."
        );
        describe_histogram!(
            METRIC_RESYNC_DURATION_MS,
            Unit::Milliseconds,
            "Wall-clock duration of a completed resync."
        );
    });
}
