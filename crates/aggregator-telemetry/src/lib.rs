//! # Aggregator Telemetry
//!
//! Observability for the event aggregator.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters and histograms for publish/delivery/prune activity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aggregator_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Your application code here
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AGGREGATOR_SERVICE_NAME` | `event-aggregator` | Service name in logs |
//! | `AGGREGATOR_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `AGGREGATOR_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `AGGREGATOR_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, LoggingHandle};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, DELIVERIES,
    DELIVERY_DURATION, HANDLER_FAILURES, MESSAGES_PUBLISHED, SUBSCRIBERS_PRUNED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Prometheus registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    Metrics(String),

    /// A configuration value could not be interpreted.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let logging = init_logging(config)?;

    Ok(TelemetryGuard {
        _logging: logging,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingHandle,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered by [`init_telemetry`].
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
