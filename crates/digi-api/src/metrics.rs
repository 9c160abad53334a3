//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub mod names {
    // HTTP
    pub const HTTP_REQUESTS_TOTAL: &str = "digi_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "digi_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "digi_http_requests_in_flight";

    // Lifecycle
    pub const DRAFTS_SAVED_TOTAL: &str = "digi_drafts_saved_total";
    pub const SUBMISSIONS_TOTAL: &str = "digi_submissions_total";
    pub const DUPLICATES_REJECTED_TOTAL: &str = "digi_duplicate_submissions_rejected_total";

    // Uploads
    pub const UPLOADS_TOTAL: &str = "digi_uploads_total";
    pub const UPLOAD_BYTES: &str = "digi_upload_bytes";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "digi_rate_limit_hits_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a draft write. `kind` is `step` or `autosave`.
pub fn record_draft_saved(kind: &'static str) {
    counter!(names::DRAFTS_SAVED_TOTAL, "kind" => kind).increment(1);
}

/// Record a finalize outcome: `created`, `recovered` or `idempotent`.
pub fn record_submission(outcome: &'static str) {
    counter!(names::SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_duplicate_rejected() {
    counter!(names::DUPLICATES_REJECTED_TOTAL).increment(1);
}

/// Record an upload attempt. `outcome` is `stored`, `rejected` or `failed`.
pub fn record_upload(kind: &str, outcome: &'static str, bytes: usize) {
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
    if outcome == "stored" {
        histogram!(names::UPLOAD_BYTES, "kind" => kind.to_string()).record(bytes as f64);
    }
}

pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Route template for the metrics label; unmatched paths share one label
/// so probes for random URLs cannot grow the series count.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_falls_back_when_unmatched() {
        let request = Request::builder()
            .uri("/api/application/steps/2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), "unmatched");
    }
}
