//! Prometheus metrics for the mock server.
//!
//! Tracks dispatch outcomes, latency and definition cache effectiveness.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Requests handled, by method and outcome (`ok`, `static`, or an error kind)
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mirage_requests_total",
        "Total number of requests handled by the mock server",
        &["method", "outcome"]
    )
    .expect("register mirage_requests_total");

    /// Time spent resolving, validating and assembling a response
    pub static ref REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mirage_request_duration_ms",
        "Histogram of request handling time in milliseconds",
        &["method"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    )
    .expect("register mirage_request_duration_ms");

    /// Definition cache lookups
    pub static ref DEFINITION_CACHE_TOTAL: CounterVec = register_counter_vec!(
        "mirage_definition_cache_total",
        "Definition cache lookups",
        &["result"]  // result: hit|miss
    )
    .expect("register mirage_definition_cache_total");
}

/// All registered metrics in Prometheus text format.
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

const METHOD_LABELS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Standard methods label as themselves; extension methods share `other`.
fn method_label(method: &str) -> &str {
    if METHOD_LABELS.contains(&method) {
        method
    } else {
        "other"
    }
}

pub fn record_request(method: &str, outcome: &str, duration_ms: f64) {
    let method = method_label(method);
    REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();
    REQUEST_DURATION_MS
        .with_label_values(&[method])
        .observe(duration_ms);
}

pub fn record_definition_cache(result: &str) {
    DEFINITION_CACHE_TOTAL.with_label_values(&[result]).inc();
}
