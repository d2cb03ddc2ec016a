//! Metrics module
//!
//! Prometheus counters and histograms for the upload pipeline.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "image_uploadr_uploads_total",
        "Total number of upload calls by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "image_uploadr_upload_bytes_total",
        "Total request body bytes sent"
    ).unwrap();

    pub static ref UPLOAD_DURATION: HistogramVec = register_histogram_vec!(
        "image_uploadr_upload_duration_seconds",
        "Upload call duration in seconds",
        &["format"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Skip and error metrics
    pub static ref SKIPS_TOTAL: CounterVec = register_counter_vec!(
        "image_uploadr_skips_total",
        "Uploads skipped in favor of the local path",
        &["reason"]
    ).unwrap();

    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "image_uploadr_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record the outcome of one upload call
pub fn record_upload_outcome(outcome: &str) {
    UPLOADS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record bytes sent in a request body
pub fn record_upload_bytes(bytes: u64) {
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record upload duration
pub fn record_upload_duration(format: &str, duration_secs: f64) {
    UPLOAD_DURATION
        .with_label_values(&[format])
        .observe(duration_secs);
}

/// Record a benign skip
pub fn record_skip(reason: &str) {
    SKIPS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
