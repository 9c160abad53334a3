//! Draft, step and submission handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use digi_models::{ApplicantFields, Draft, StepValidation};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::{StepAdvance, Submission};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: Option<Draft>,
}

#[derive(Debug, Serialize)]
pub struct AutosaveResponse {
    pub status: &'static str,
    pub debounce_ms: u64,
}

/// Get saved progress.
pub async fn get_draft(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<DraftResponse>> {
    let draft = state.lifecycle.progress().get_progress(&auth.user.email).await?;
    Ok(Json(DraftResponse { draft }))
}

/// Queue a debounced autosave of in-progress values.
pub async fn autosave_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(fields): Json<ApplicantFields>,
) -> ApiResult<(StatusCode, Json<AutosaveResponse>)> {
    state.lifecycle.schedule_autosave(&auth.user, fields).await?;
    let debounce_ms = state.lifecycle.autosave_scheduler().delay().as_millis() as u64;
    Ok((
        StatusCode::ACCEPTED,
        Json(AutosaveResponse {
            status: "scheduled",
            debounce_ms,
        }),
    ))
}

/// Validate a step, save it and move on.
pub async fn advance_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(step): Path<u32>,
    Json(fields): Json<ApplicantFields>,
) -> ApiResult<Json<StepAdvance>> {
    let advance = state.lifecycle.advance(&auth.user, step, &fields).await?;
    Ok(Json(advance))
}

/// Validate a step without saving.
pub async fn validate_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(step): Path<u32>,
    Json(fields): Json<ApplicantFields>,
) -> ApiResult<Json<StepValidation>> {
    let validation = state.lifecycle.check_step(&auth.user, step, &fields).await?;
    Ok(Json(validation))
}

/// Save the last step and finalize.
pub async fn submit_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(fields): Json<ApplicantFields>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let submission = state.lifecycle.submit(&auth.user, &fields).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Finalize the saved draft.
pub async fn finalize_application(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Submission>> {
    let submission = state.lifecycle.finalize(&auth.user).await?;
    Ok(Json(submission))
}
