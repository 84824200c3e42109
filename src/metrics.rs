//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("friendfeed_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "friendfeed_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("friendfeed_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref POSTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "friendfeed_posts_created_total",
        "Total number of posts created"
    ).expect("metric can be created");
    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "friendfeed_comments_created_total",
        "Total number of comments created"
    ).expect("metric can be created");
    pub static ref USERS_REGISTERED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("friendfeed_users_registered_total", "Total number of registrations"),
        &["credential_type"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref IMAGE_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("friendfeed_image_uploads_total", "Total number of image uploads"),
        &["status"]
    ).expect("metric can be created");
    pub static ref IMAGE_BYTES_UPLOADED: IntCounter = IntCounter::new(
        "friendfeed_image_bytes_uploaded_total",
        "Total bytes of images uploaded"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("friendfeed_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(DB_QUERIES_TOTAL.clone()))
            .expect("DB_QUERIES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(POSTS_CREATED_TOTAL.clone()))
            .expect("POSTS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(COMMENTS_CREATED_TOTAL.clone()))
            .expect("COMMENTS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS_REGISTERED_TOTAL.clone()))
            .expect("USERS_REGISTERED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(IMAGE_UPLOADS_TOTAL.clone()))
            .expect("IMAGE_UPLOADS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(IMAGE_BYTES_UPLOADED.clone()))
            .expect("IMAGE_BYTES_UPLOADED can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Count one query against `table`
pub fn observe_db_query(operation: &str, table: &str) {
    DB_QUERIES_TOTAL
        .with_label_values(&[operation, table])
        .inc();
}

/// Record a finished HTTP request
pub fn observe_http_request(method: &str, endpoint: &str, status: u16, elapsed: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(elapsed.as_secs_f64());
}
