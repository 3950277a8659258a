//! Prometheus metrics for the news feed

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static FEED_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "news_feed_requests_total",
        "Total news feed requests (success/error)",
        &["status"]
    )
    .expect("Failed to register news feed requests metric")
});

static POOL_CANDIDATES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "news_feed_pool_candidates",
        "Candidates returned by each pool per request",
        &["pool"],
        vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .expect("Failed to register pool candidates metric")
});

static POOL_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "news_feed_pool_failures_total",
        "Candidate pool queries that failed and were skipped",
        &["pool"]
    )
    .expect("Failed to register pool failures metric")
});

static FEED_SIZE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "news_feed_generated_size",
        "Number of posts in a generated feed",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0]
    )
    .expect("Failed to register feed size metric")
});

static VIEWS_RECORDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "news_feed_views_recorded_total",
        "PostView rows inserted by the news feed"
    )
    .expect("Failed to register views recorded metric")
});

static DEGRADED_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "news_feed_degraded_lookups_total",
        "Viewer or hydration lookups that failed and fell back to empty",
        &["lookup"]
    )
    .expect("Failed to register degraded lookups metric")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "news_feed_http_request_duration_seconds",
        "HTTP request latencies for news-feed-service",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http duration metric")
});

/// Record feed request result (success/error)
pub fn record_feed_request(status: &str) {
    FEED_REQUESTS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_pool_candidates(pool: &str, count: usize) {
    POOL_CANDIDATES
        .with_label_values(&[pool])
        .observe(count as f64);
}

pub fn record_pool_failure(pool: &str) {
    POOL_FAILURES_TOTAL.with_label_values(&[pool]).inc();
}

pub fn record_feed_size(size: usize) {
    FEED_SIZE.observe(size as f64);
}

pub fn record_views(inserted: u64) {
    VIEWS_RECORDED_TOTAL.inc_by(inserted);
}

/// Record a lookup that degraded to an empty result (following/joined/likes/comments)
pub fn record_degraded_lookup(lookup: &str) {
    DEGRADED_LOOKUPS_TOTAL.with_label_values(&[lookup]).inc();
}

pub fn observe_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status.to_string()])
        .observe(duration.as_secs_f64());
}

/// `GET /metrics`
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
