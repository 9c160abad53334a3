//! Firestore error types.

use thiserror::Error;

pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Delay used for 429 responses without a usable Retry-After.
const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum FirestoreError {
    // Transport

    #[error("Firestore unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Firestore throttled the request, retry in {0}ms")]
    RateLimited(u64),

    #[error("Firestore returned {0}: {1}")]
    ServerError(u16, String),

    // Access

    #[error("Firestore rejected credentials: {0}")]
    AuthError(String),

    #[error("Firestore denied access: {0}")]
    PermissionDenied(String),

    // Documents

    #[error("No such document: {0}")]
    NotFound(String),

    #[error("Document exists: {0}")]
    AlreadyExists(String),

    #[error("Write precondition not met: {0}")]
    PreconditionFailed(String),

    // Payloads

    #[error("Firestore request rejected: {0}")]
    RequestFailed(String),

    #[error("Unexpected Firestore response: {0}")]
    InvalidResponse(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Classify a non-success response. Firestore reports failed
    /// preconditions on commit as a 400 carrying `FAILED_PRECONDITION`.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 => Self::RateLimited(DEFAULT_RATE_LIMIT_DELAY_MS),
            500..=599 => Self::ServerError(status, body),
            401 => Self::AuthError(body),
            403 => Self::PermissionDenied(body),
            404 => Self::NotFound(body),
            409 => Self::AlreadyExists(body),
            412 => Self::PreconditionFailed(body),
            400 if body.contains("FAILED_PRECONDITION") => Self::PreconditionFailed(body),
            _ => Self::RequestFailed(body),
        }
    }

    /// Status recorded in metrics for this error.
    pub fn http_status(&self) -> Option<u16> {
        let status = match self {
            Self::Network(e) => return e.status().map(|s| s.as_u16()),
            Self::ServerError(status, _) => *status,
            Self::RateLimited(_) => 429,
            Self::AuthError(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::PreconditionFailed(_) => 412,
            Self::RequestFailed(_) | Self::InvalidResponse(_) | Self::Json(_) => return None,
        };
        Some(status)
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        if let Self::RateLimited(ms) = self {
            Some(*ms)
        } else {
            None
        }
    }

    /// Transport failures, throttling and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.retry_after_ms().is_some() || matches!(self, Self::Network(_) | Self::ServerError(..))
    }

    /// True if a write lost to an existing document.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists(_) | Self::PreconditionFailed(_))
    }
}
