//! Upload endpoints.

use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::Json;
use digi_models::{UploadKind, UploadRejection};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::UploadResult;
use crate::state::UploadState;
use crate::storage::{public_path, stored_name};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Path the file is served under
    pub file_path: String,
    pub file_url: String,
}

pub async fn upload_cv(
    State(state): State<UploadState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResult<Json<UploadResponse>> {
    receive(&state, UploadKind::Cv, &headers, multipart).await
}

pub async fn upload_photo(
    State(state): State<UploadState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResult<Json<UploadResponse>> {
    receive(&state, UploadKind::Photo, &headers, multipart).await
}

async fn receive(
    state: &UploadState,
    kind: UploadKind,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResult<Json<UploadResponse>> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            debug!("Not a multipart request: {}", rejection);
            return Err(UploadRejection::NoFile.into());
        }
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.field_name()) {
            continue;
        }
        // Browsers send an empty filename when no file was picked.
        let Some(original_name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string)
        else {
            continue;
        };
        kind.check(field.content_type(), 0)?;

        let name = stored_name(kind, &original_name);
        let bytes = save_field(state, kind, &name, field).await?;
        info!(kind = %kind, bytes, "Stored upload {}", name);

        let file_path = public_path(kind, &name);
        let file_url = format!("{}{}", origin(headers, &state.fallback_host), file_path);
        return Ok(Json(UploadResponse {
            success: true,
            file_path,
            file_url,
        }));
    }

    Err(UploadRejection::NoFile.into())
}

/// Stream a field to disk, removing the partial file on any failure.
async fn save_field(
    state: &UploadState,
    kind: UploadKind,
    name: &str,
    field: Field<'_>,
) -> UploadResult<usize> {
    let path = state.store.path_for(kind, name);
    let result = write_limited(&path, kind, field).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove partial upload {}: {}", path.display(), e);
        }
    }
    result
}

async fn write_limited(
    path: &std::path::Path,
    kind: UploadKind,
    mut field: Field<'_>,
) -> UploadResult<usize> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await? {
        written += chunk.len();
        if written > kind.max_bytes() {
            return Err(UploadRejection::TooLarge(kind).into());
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(written)
}

/// `scheme://host` of the request, honouring `X-Forwarded-Proto`.
fn origin(headers: &HeaderMap, fallback_host: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback_host);
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_origin_prefers_request_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(origin(&headers, "localhost:3001"), "http://localhost:3001");

        headers.insert(HOST, HeaderValue::from_static("files.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(origin(&headers, "localhost:3001"), "https://files.example.com");
    }
}
