//! Liveness and readiness probes.

use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Outcome of one dependency probe.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Probe {
    Ok { latency_ms: u64 },
    Error { error: String },
}

impl Probe {
    async fn run<E: std::fmt::Display>(check: impl Future<Output = Result<(), E>>) -> Self {
        let start = Instant::now();
        match check.await {
            Ok(()) => Self::Ok {
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }

    fn passed(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub firestore: Probe,
    pub storage: Probe,
    pub auth_keys: Probe,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: Dependencies,
}

/// Probe the document store, object storage and token signing keys
/// concurrently. Any failure answers 503.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let (firestore, storage, auth_keys) = tokio::join!(
        Probe::run(state.drafts.ping()),
        Probe::run(state.files.check_connectivity()),
        Probe::run(state.verifier.check_ready()),
    );

    let checks = Dependencies {
        firestore,
        storage,
        auth_keys,
    };
    let ready = checks.firestore.passed() && checks.storage.passed() && checks.auth_keys.passed();
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (status, Json(ReadinessResponse { status: label, checks }))
}
