//! Metrics and observability utilities
//!
//! Metric names share one prefix; the binary installs the Prometheus
//! recorder, everything here only talks to the `metrics` facade.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Rover Recipes metrics
pub const METRICS_PREFIX: &str = "roverrecipes";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_recipes_created_total", METRICS_PREFIX),
        Unit::Count,
        "Recipes committed"
    );

    describe_counter!(
        format!("{}_recipe_create_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Recipe creation requests that were rolled back"
    );

    describe_histogram!(
        format!("{}_recipe_create_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time to stage photos and write a recipe"
    );

    describe_counter!(
        format!("{}_photos_stored_total", METRICS_PREFIX),
        Unit::Count,
        "Uploaded photos moved into the photos directory"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a committed recipe
pub fn record_recipe_created(duration_secs: f64, ingredients: usize, steps: usize) {
    counter!(format!("{}_recipes_created_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_recipe_create_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    tracing::debug!(ingredients, steps, duration_secs, "Recipe creation recorded");
}

/// Helper to record a rolled back recipe creation
pub fn record_recipe_failure(reason: &str) {
    counter!(
        format!("{}_recipe_create_failures_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Helper to record promoted photos
pub fn record_photos_stored(count: usize) {
    if count > 0 {
        counter!(format!("{}_photos_stored_total", METRICS_PREFIX)).increment(count as u64);
    }
}
