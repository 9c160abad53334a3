//! Current session handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use digi_models::{AuthEvent, SessionState};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::SessionStart;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionState,
    /// Where the wizard starts for this applicant
    pub application: SessionStart,
}

/// Restore the session from the bearer token and decide where the
/// applicant resumes.
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<SessionResponse>> {
    let application = state.lifecycle.start_session(&auth.user).await?;
    Ok(Json(SessionResponse {
        session: SessionState::replay([AuthEvent::InitialSession(Some(auth.user))]),
        application,
    }))
}
