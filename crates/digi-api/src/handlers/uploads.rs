//! File upload handlers.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use digi_models::{Field, UploadKind, UploadRejection};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public URL to store in the form
    pub url: String,
    /// Form field the URL belongs in
    pub field: Field,
    pub bucket: String,
    pub key: String,
}

struct ReceivedFile {
    name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// A body cut off by the request size limit is reported as an oversized
/// file rather than a malformed form.
fn multipart_error(kind: UploadKind, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadRejection::TooLarge(kind).into();
    }
    ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
}

/// Pull the file for `kind` out of the form. Other fields are ignored.
async fn read_file(kind: UploadKind, multipart: &mut Multipart) -> ApiResult<Option<ReceivedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(kind, e))?
    {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        let name = field.file_name().unwrap_or(kind.field_name()).to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(kind, e))?;
        if data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ReceivedFile {
            name,
            content_type,
            data: data.to_vec(),
        }));
    }
    Ok(None)
}

async fn receive_upload(
    state: &AppState,
    auth: &AuthUser,
    kind: UploadKind,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let Some(file) = read_file(kind, &mut multipart).await? else {
        metrics::record_upload(kind.field_name(), "rejected", 0);
        return Err(UploadRejection::NoFile.into());
    };

    let size = file.data.len();
    if let Err(rejection) = kind.check(file.content_type.as_deref(), size) {
        metrics::record_upload(kind.field_name(), "rejected", size);
        return Err(rejection.into());
    }

    let content_type = file.content_type.unwrap_or_default();
    let stored = match state.files.upload(kind, &file.name, file.data, &content_type).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Upload failed");
            metrics::record_upload(kind.field_name(), "failed", size);
            return Err(e.into());
        }
    };

    metrics::record_upload(kind.field_name(), "stored", size);
    info!(kind = %kind, uid = %auth.user.uid, key = %stored.key, bytes = size, "Stored upload");
    Ok(Json(UploadResponse {
        url: stored.public_url,
        field: kind.url_field(),
        bucket: stored.bucket,
        key: stored.key,
    }))
}

/// Upload a CV (PDF, up to 5 MB).
pub async fn upload_cv(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    receive_upload(&state, &auth, UploadKind::Cv, multipart).await
}

/// Upload a profile photo (any image type, up to 2 MB).
pub async fn upload_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    receive_upload(&state, &auth, UploadKind::Photo, multipart).await
}
