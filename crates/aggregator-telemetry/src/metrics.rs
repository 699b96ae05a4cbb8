//! Prometheus metrics for the event aggregator.
//!
//! All metrics follow the naming convention: `aggregator_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., deliveries_total)
//! - **Histogram**: Distribution of values (e.g., publish_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Messages handed to `publish`, by message type
    pub static ref MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("aggregator_messages_published_total", "Total messages published"),
        &["message_type"]
    ).expect("metric creation failed");

    /// Handler invocations
    pub static ref DELIVERIES: Counter = Counter::new(
        "aggregator_deliveries_total",
        "Total handler invocations across all subscribers"
    ).expect("metric creation failed");

    /// Handlers that returned an error
    pub static ref HANDLER_FAILURES: Counter = Counter::new(
        "aggregator_handler_failures_total",
        "Total handler invocations that returned an error"
    ).expect("metric creation failed");

    /// Entries removed because their subscriber was dropped
    pub static ref SUBSCRIBERS_PRUNED: Counter = Counter::new(
        "aggregator_subscribers_pruned_total",
        "Total dead subscriber entries removed from the registry"
    ).expect("metric creation failed");

    /// Time spent running one delivery pass
    pub static ref DELIVERY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "aggregator_delivery_duration_seconds",
            "Time spent delivering one message to all matching subscribers"
        ).buckets(exponential_buckets(0.000_001, 4.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Encode this handle's metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode(&self.registry)
    }
}

/// Register all aggregator metrics with the global registry.
///
/// Fails if called twice.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(SUBSCRIBERS_PRUNED.clone()),
        Box::new(DELIVERY_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode(&REGISTRY)
}

fn encode(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
