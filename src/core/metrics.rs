//! Prometheus metrics for monitoring the relay server.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint, and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: GaugeVec,

    /// Provider response latency histogram in seconds
    pub provider_latency: HistogramVec,

    /// Failed provider calls by provider and failure kind
    pub provider_errors: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call more than once; later calls return the same instance.
///
/// # Examples
///
/// ```no_run
/// use genai_relay::core::metrics::init_metrics;
///
/// let metrics = init_metrics();
/// metrics.request_count.with_label_values(&["GET", "/hello", "200"]).inc();
/// ```
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "relay_requests_total",
            "Total number of requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "relay_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_gauge_vec!(
            "relay_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let provider_latency = register_histogram_vec!(
            "relay_provider_latency_seconds",
            "Provider response latency in seconds",
            &["provider"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register provider_latency metric");

        let provider_errors = register_int_counter_vec!(
            "relay_provider_errors_total",
            "Total number of failed provider calls",
            &["provider", "kind"]
        )
        .expect("Failed to register provider_errors metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            provider_latency,
            provider_errors,
        }
    })
}

/// Get the metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics() as *const Metrics;
        let second = init_metrics() as *const Metrics;
        assert_eq!(first, second);
    }

    #[test]
    fn test_provider_errors_counter() {
        let metrics = get_metrics();
        let counter = metrics
            .provider_errors
            .with_label_values(&["metrics-test-provider", "timeout"]);
        let before = counter.get();
        counter.inc();
        assert_eq!(counter.get(), before + 1);
    }
}
