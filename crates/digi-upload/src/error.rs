//! Upload server errors.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use digi_models::UploadRejection;
use serde::Serialize;
use tracing::error;

pub type UploadResult<T> = Result<T, UploadError>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] UploadRejection),

    /// The multipart body could not be parsed
    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Io(e) => {
                error!("Upload failed: {}", e);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digi_models::UploadKind;

    #[test]
    fn test_rejections_are_client_errors() {
        let err = UploadError::from(UploadRejection::TooLarge(UploadKind::Photo));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "File size too large");
    }

    #[test]
    fn test_io_errors_hide_detail() {
        let err = UploadError::from(std::io::Error::other("disk full"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
