//! Store request metrics, labelled by collection so draft and application
//! traffic can be told apart.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    pub const REQUESTS_TOTAL: &str = "digi_firestore_requests_total";
    pub const RETRIES_TOTAL: &str = "digi_firestore_retries_total";
    pub const LATENCY_SECONDS: &str = "digi_firestore_latency_seconds";
}

/// Outcome label for an HTTP status.
pub fn outcome(status: u16) -> &'static str {
    match status {
        200..=299 => "ok",
        404 => "not_found",
        409 | 412 => "conflict",
        429 | 503 => "throttled",
        _ => "error",
    }
}

pub fn record_request(operation: &'static str, collection: &str, status: u16, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation,
        "collection" => collection.to_string(),
        "outcome" => outcome(status)
    )
    .increment(1);
    histogram!(names::LATENCY_SECONDS, "operation" => operation).record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}
