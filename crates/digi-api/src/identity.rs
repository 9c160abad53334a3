//! Identity Toolkit REST client for email/password accounts.
//!
//! OAuth sign-in completes in the provider; this client covers the
//! password flows: sign-up, sign-in, reset email and password update.

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use digi_models::SessionUser;

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("An account with this email already exists")]
    EmailExists,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("{0}")]
    WeakPassword(String),

    #[error("This account has been disabled")]
    UserDisabled,

    #[error("Too many attempts. Please try again later.")]
    TooManyAttempts,

    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Identity provider unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Identity provider not configured: {0}")]
    NotConfigured(String),
}

impl IdentityError {
    /// Map an Identity Toolkit error message such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_provider_message(message: &str) -> Self {
        let (code, detail) = match message.split_once(" : ") {
            Some((code, detail)) => (code.trim(), Some(detail.trim())),
            None => (message.trim(), None),
        };

        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                Self::InvalidCredentials
            }
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "WEAK_PASSWORD" => Self::WeakPassword(
                detail
                    .unwrap_or("Password should be at least 6 characters")
                    .to_string(),
            ),
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
            | "USER_NOT_FOUND" => Self::SessionExpired,
            _ => Self::Provider(message.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmailExists => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::InvalidEmail | Self::WeakPassword(_) => StatusCode::BAD_REQUEST,
            Self::EmailNotConfirmed | Self::UserDisabled => StatusCode::FORBIDDEN,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::Provider(_) | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailExists => "email_exists",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidEmail => "invalid_email",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::WeakPassword(_) => "weak_password",
            Self::UserDisabled => "user_disabled",
            Self::TooManyAttempts => "too_many_attempts",
            Self::SessionExpired => "session_expired",
            Self::Provider(_) | Self::Network(_) => "identity_provider_error",
            Self::NotConfigured(_) => "identity_not_configured",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Web API key of the Firebase project
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, IdentityError> {
        let api_key = std::env::var("FIREBASE_API_KEY")
            .map_err(|_| IdentityError::NotConfigured("FIREBASE_API_KEY not set".to_string()))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("IDENTITY_TOOLKIT_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_TOOLKIT_URL.to_string()),
            timeout: Duration::from_secs(15),
        })
    }
}

/// Tokens issued by a successful sign-in or password change.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires
    pub expires_in: u64,
    pub user: SessionUser,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: ProviderError,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

impl TokenResponse {
    fn into_session(self, email_verified: bool) -> IdentitySession {
        IdentitySession {
            expires_in: self
                .expires_in
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            user: SessionUser {
                uid: self.local_id,
                email: self.email.to_lowercase(),
                display_name: self.display_name.filter(|n| !n.is_empty()),
                email_verified,
            },
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    config: IdentityConfig,
}

impl IdentityClient {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, IdentityError> {
        Self::new(IdentityConfig::from_env()?)
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}",
            self.config.base_url.trim_end_matches('/'),
            method
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, IdentityError> {
        let response = self
            .http
            .post(self.endpoint(method))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: ProviderErrorBody = response.json().await.unwrap_or_default();
        debug!(method, status = %status, message = %body.error.message, "Identity call failed");
        if body.error.message.is_empty() {
            return Err(IdentityError::Provider(format!("HTTP {}", status)));
        }
        Err(IdentityError::from_provider_message(&body.error.message))
    }

    /// Register an account and send the confirmation email. The account
    /// cannot sign in until the email is confirmed.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SessionUser, IdentityError> {
        let mut body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
            body["displayName"] = json!(name.trim());
        }

        let created: TokenResponse = self.call("signUp", body).await?;
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "VERIFY_EMAIL", "idToken": created.id_token }),
            )
            .await?;

        info!(uid = %created.local_id, "Registered account, confirmation email sent");
        Ok(created.into_session(false).user)
    }

    /// Sign in with email and password. Unconfirmed accounts are refused.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        let tokens: TokenResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let lookup: LookupResponse = self
            .call("lookup", json!({ "idToken": tokens.id_token }))
            .await?;
        let account = lookup
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::InvalidCredentials)?;
        if !account.email_verified {
            return Err(IdentityError::EmailNotConfirmed);
        }

        let mut session = tokens.into_session(true);
        if session.user.display_name.is_none() {
            session.user.display_name = account.display_name.filter(|n| !n.is_empty());
        }
        Ok(session)
    }

    /// Send the password-reset email.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    /// Set a new password for the holder of `id_token`.
    pub async fn update_password(
        &self,
        id_token: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let updated: TokenResponse = self
            .call(
                "update",
                json!({ "idToken": id_token, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let verified = updated.email_verified.unwrap_or(true);
        Ok(updated.into_session(verified))
    }
}
