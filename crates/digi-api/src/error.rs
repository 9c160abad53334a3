//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use digi_firestore::FirestoreError;
use digi_models::{Field, FormStep, UploadRejection};
use digi_storage::StorageError;

use crate::identity::IdentityError;
use crate::services::{LifecycleError, StoreError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Upload(#[from] UploadRejection),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Lifecycle(e) => match e {
                LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
                LifecycleError::DraftNotFound => StatusCode::NOT_FOUND,
                LifecycleError::IncompleteSteps(_) | LifecycleError::DuplicateSubmission => {
                    StatusCode::CONFLICT
                }
                LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Identity(e) => e.status_code(),
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Firestore(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::RateLimited => Some("rate_limited"),
            ApiError::Upload(_) => Some("upload_rejected"),
            ApiError::Lifecycle(LifecycleError::Validation(_)) => Some("validation_error"),
            ApiError::Lifecycle(LifecycleError::DraftNotFound) => Some("draft_not_found"),
            ApiError::Lifecycle(LifecycleError::IncompleteSteps(_)) => Some("incomplete_steps"),
            ApiError::Lifecycle(LifecycleError::DuplicateSubmission) => Some("duplicate_submission"),
            ApiError::Identity(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Errors whose text may leak backend details.
    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_)
                | ApiError::Storage(_)
                | ApiError::Firestore(_)
                | ApiError::Store(_)
                | ApiError::Lifecycle(LifecycleError::Store(_))
                | ApiError::Identity(IdentityError::Network(_) | IdentityError::Provider(_))
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    incomplete_steps: Vec<FormStep>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let (missing_fields, incomplete_steps) = match &self {
            ApiError::Lifecycle(LifecycleError::Validation(v)) => (v.missing_fields.clone(), Vec::new()),
            ApiError::Lifecycle(LifecycleError::IncompleteSteps(steps)) => (Vec::new(), steps.clone()),
            _ => (Vec::new(), Vec::new()),
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
            missing_fields,
            incomplete_steps,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use digi_models::validate_step;
    use digi_models::ApplicantFields;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_lists_missing_fields() {
        let validation = validate_step(1, &ApplicantFields::default());
        let (status, body) = body_json(LifecycleError::Validation(validation).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
        assert_eq!(
            body["missing_fields"],
            serde_json::json!(["nama", "email", "npm", "angkatan"])
        );
        assert_eq!(
            body["detail"],
            "Missing required fields: nama, email, npm, angkatan"
        );
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_conflict() {
        let (status, body) = body_json(LifecycleError::DuplicateSubmission.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "duplicate_submission");
        assert!(body.get("missing_fields").is_none());
    }

    #[tokio::test]
    async fn test_incomplete_steps_body() {
        let err = LifecycleError::IncompleteSteps(vec![FormStep::Contact]);
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["incomplete_steps"], serde_json::json!([2]));
    }

    #[tokio::test]
    async fn test_upload_rejection_message() {
        let (status, body) = body_json(UploadRejection::NoFile.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "No file uploaded");
    }

    #[test]
    fn test_identity_status_passthrough() {
        assert_eq!(
            ApiError::from(IdentityError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(StorageError::upload_failed("cv-files", "1-a.pdf", "boom")).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
