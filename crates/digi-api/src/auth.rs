//! Firebase ID token authentication.
//!
//! Every authenticated route takes an [`AuthUser`], which verifies the
//! bearer token against Google's published signing keys and turns the
//! claims into the session user the lifecycle works with.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use digi_models::SessionUser;

use crate::error::ApiError;
use crate::state::AppState;

/// Google JWKS URL for Firebase Auth.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Minimum gap between refreshes triggered by an unknown key ID.
const UNKNOWN_KID_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Decoded Firebase ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// User ID
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    /// Display name from the identity profile
    pub name: Option<String>,
    pub iss: String,
    /// Firebase project ID
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: Option<i64>,
}

impl FirebaseClaims {
    /// Session user for these claims. Accounts without an email cannot
    /// hold an application.
    pub fn into_session_user(self) -> Result<SessionUser, ApiError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ApiError::forbidden("Account has no email address"))?;
        Ok(SessionUser {
            uid: self.sub,
            email: email.to_lowercase(),
            display_name: self.name,
            email_verified: self.email_verified.unwrap_or(false),
        })
    }
}

/// Checks ID tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FirebaseClaims, ApiError>;

    /// Check the key source is reachable.
    async fn check_ready(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
}

/// Cached JWKS keys. Keys are fetched on first use and refreshed hourly.
pub struct JwksCache {
    http: Client,
    jwks_url: String,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Option<Instant>>,
    project_id: String,
}

impl JwksCache {
    pub fn new(project_id: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to build JWKS client: {}", e)))?;

        Ok(Self {
            http,
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            project_id: project_id.into(),
        })
    }

    /// Fetch keys from another URL.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Refresh JWKS keys. Returns the number of keys loaded.
    pub async fn refresh_keys(&self) -> Result<usize, ApiError> {
        debug!("Refreshing JWKS keys");
        // Record the attempt first so a failing endpoint is not hammered.
        *self.last_refresh.write().await = Some(Instant::now());

        let jwks: JwksResponse = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::internal(format!("JWKS fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("JWKS decode failed: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => warn!(kid = %jwk.kid, "Skipping unusable JWKS key: {}", e),
            }
        }

        let count = keys.len();
        *self.keys.write().await = keys;
        debug!("Refreshed {} JWKS keys", count);
        Ok(count)
    }

    async fn refresh_due(&self, max_age: Duration) -> bool {
        self.last_refresh
            .read()
            .await
            .map_or(true, |last| last.elapsed() > max_age)
    }

    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        if self.refresh_due(JWKS_CACHE_TTL).await {
            if let Err(e) = self.refresh_keys().await {
                warn!("Failed to refresh JWKS keys: {}", e);
            }
        }

        if let Some(key) = self.keys.read().await.get(kid).cloned() {
            return Some(key);
        }

        // Google rotates keys; an unseen kid may be newer than the cache.
        if self.refresh_due(UNKNOWN_KID_REFRESH_INTERVAL).await {
            if let Err(e) = self.refresh_keys().await {
                warn!("Failed to refresh JWKS keys: {}", e);
            }
        }
        self.keys.read().await.get(kid).cloned()
    }
}

#[async_trait]
impl TokenVerifier for JwksCache {
    async fn verify(&self, token: &str) -> Result<FirebaseClaims, ApiError> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("Token missing key ID"))?;

        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unknown key ID"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation.set_audience(&[&self.project_id]);

        let token_data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        Ok(token_data.claims)
    }

    async fn check_ready(&self) -> Result<(), ApiError> {
        if self.keys.read().await.is_empty() {
            self.refresh_keys().await?;
        }
        Ok(())
    }
}

/// Authenticated applicant extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: SessionUser,
    /// The verified bearer token, for calls made on the user's behalf
    pub id_token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Missing or invalid Authorization header"))?;

        let claims = state.verifier.verify(bearer.token()).await?;
        let user = claims.into_session_user()?;
        if !user.email_verified {
            return Err(ApiError::forbidden("Email not confirmed"));
        }

        Ok(AuthUser {
            user,
            id_token: bearer.token().to_string(),
        })
    }
}
