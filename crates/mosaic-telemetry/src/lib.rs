//! Logging and metrics for Mosaic.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus exposition via the `metrics` facade
//!
//! The router records its metrics through
//! [`record_resolution`](crate::metrics::record_resolution) and
//! [`record_url_construction`](crate::metrics::record_url_construction);
//! both are free when no recorder is installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use mosaic_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("intranet")
//!     .logging(LogConfig::production())
//!     .metrics_addr("0.0.0.0:9090")
//!     .build();
//!
//! let _guard = init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use self::metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Marks telemetry as installed; logs when dropped.
///
/// Keep it alive for the lifetime of the application.
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    /// Returns the configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service_name = %self.service_name, "telemetry shut down");
    }
}

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::info!(
        service_name = %config.service_name,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_everything_disabled() {
        let config = TelemetryConfig {
            logging: LogConfig {
                enabled: false,
                ..LogConfig::default()
            },
            metrics: MetricsConfig {
                enabled: false,
                ..MetricsConfig::default()
            },
            ..TelemetryConfig::default()
        };
        let guard = init_telemetry(&config).unwrap();
        assert_eq!(guard.service_name(), "mosaic");
    }
}
