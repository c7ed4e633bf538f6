//! Prometheus metrics for Mosaic.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `mosaic_resolutions_total` | Counter | `service`, `outcome` | Resolved requests |
//! | `mosaic_resolution_duration_seconds` | Histogram | `outcome` | Resolution latency |
//! | `mosaic_url_constructions_total` | Counter | `service`, `outcome` | URL constructions |
//!
//! Recording functions are no-ops until [`init_metrics`] installs a
//! recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Resolution counter.
pub const RESOLUTIONS_TOTAL: &str = "mosaic_resolutions_total";

/// Resolution latency histogram.
pub const RESOLUTION_DURATION: &str = "mosaic_resolution_duration_seconds";

/// URL construction counter.
pub const URL_CONSTRUCTIONS_TOTAL: &str = "mosaic_url_constructions_total";

/// Service label used when no service was selected.
pub const NO_SERVICE: &str = "none";

/// Values of the `outcome` label.
pub mod outcome {
    /// Success.
    pub const OK: &str = "ok";

    /// An assertion rejected the resource during URL construction.
    pub const NOT_LINKABLE: &str = "not_linkable";

    /// No service matched the request.
    pub const UNRESOLVED: &str = "unresolved";

    /// A fatal error aborted the operation.
    pub const ERROR: &str = "error";
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address of the scrape endpoint (e.g. "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for resolution latency, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            // 100us to 1s; resolution is a tree walk plus one retrieval
            duration_buckets: vec![
                0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// `config.addr` is validated but not served: `install_recorder` only sets
/// the global recorder. Expose the output of [`render_metrics`] from the
/// hosting web layer. Does nothing if `config.enabled` is false.
///
/// # Errors
///
/// - `TelemetryError::InvalidAddress` if `config.addr` does not parse.
/// - `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(RESOLUTION_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    Ok(())
}

/// Renders all metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(RESOLUTIONS_TOTAL, "Requests resolved to a service, by outcome");
    describe_histogram!(RESOLUTION_DURATION, "Request resolution time in seconds");
    describe_counter!(URL_CONSTRUCTIONS_TOTAL, "Service URL constructions, by outcome");
}

/// Records one resolution attempt.
///
/// `service` is `None` when no service was selected.
pub fn record_resolution(service: Option<&str>, outcome: &str, duration: Duration) {
    counter!(
        RESOLUTIONS_TOTAL,
        "service" => service.unwrap_or(NO_SERVICE).to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(RESOLUTION_DURATION, "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

/// Records one URL construction attempt for `service`.
pub fn record_url_construction(service: &str, outcome: &str) {
    counter!(
        URL_CONSTRUCTIONS_TOTAL,
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
