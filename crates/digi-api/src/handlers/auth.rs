//! Email/password account handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use digi_models::{check_password_strength, AuthEvent, SessionState, SessionUser};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::identity::{IdentityError, IdentitySession};
use crate::state::AppState;

/// Reject a request body that fails its field rules, reporting the first
/// failing rule's message.
pub(crate) fn validate_body<T: Validate>(body: &T) -> ApiResult<()> {
    body.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid request".to_string());
        ApiError::bad_request(message)
    })
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub session: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl AuthResponse {
    fn signed_out() -> Self {
        Self {
            session: SessionState::replay([AuthEvent::SignedOut]),
            id_token: None,
            refresh_token: None,
            expires_in: None,
        }
    }

    /// Fold the provider's answer into the session the caller already had.
    fn from_session(
        prior: SessionState,
        event: fn(SessionUser) -> AuthEvent,
        session: IdentitySession,
    ) -> Self {
        Self {
            session: prior.apply(event(session.user)),
            id_token: Some(session.id_token),
            refresh_token: Some(session.refresh_token),
            expires_in: Some(session.expires_in),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: SessionUser,
    pub session: SessionState,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Register with email and password.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    validate_body(&req)?;
    let email = req.email.trim().to_lowercase();

    let user = state
        .identity
        .sign_up(&email, &req.password, req.full_name.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user,
            // No session until the email is confirmed.
            session: SessionState::replay([AuthEvent::InitialSession(None)]),
            message: "Registration successful. Please check your email to confirm your account.",
        }),
    ))
}

/// Sign in with email and password.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<AuthResponse>> {
    validate_body(&req)?;
    let email = req.email.trim().to_lowercase();

    let session = state.identity.sign_in(&email, &req.password).await?;
    info!(uid = %session.user.uid, "Signed in");
    Ok(Json(AuthResponse::from_session(
        SessionState::default(),
        AuthEvent::SignedIn,
        session,
    )))
}

/// End the session. Tokens are held by the client, which discards them.
pub async fn sign_out() -> Json<AuthResponse> {
    Json(AuthResponse::signed_out())
}

/// Send a password-reset email.
///
/// Unknown addresses get the same answer as known ones.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validate_body(&req)?;
    let email = req.email.trim().to_lowercase();

    match state.identity.send_password_reset(&email).await {
        Ok(()) | Err(IdentityError::InvalidCredentials) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(Json(MessageResponse {
        message: "Password reset email sent. Please check your inbox.",
    }))
}

/// Set a new password for the signed-in user.
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let strength = check_password_strength(&req.password);
    if !strength.valid {
        return Err(ApiError::bad_request(strength.message));
    }
    if req.password != req.confirm_password {
        return Err(ApiError::bad_request("Passwords don't match"));
    }

    let session = state
        .identity
        .update_password(&auth.id_token, &req.password)
        .await?;
    info!(uid = %auth.user.uid, "Password updated");
    let current = SessionState::replay([AuthEvent::InitialSession(Some(auth.user))]);
    Ok(Json(AuthResponse::from_session(
        current,
        AuthEvent::UserUpdated,
        session,
    )))
}
