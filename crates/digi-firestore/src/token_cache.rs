//! OAuth access tokens for the Firestore REST API.
//!
//! Tokens are refreshed a minute before they expire. Concurrent callers
//! wait on one refresh instead of each asking the provider. If a refresh
//! fails while the old token has not expired yet, the old token is used.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const REFRESH_AHEAD: Duration = Duration::from_secs(60);

pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Token the Firestore emulator accepts as an admin credential.
pub const EMULATOR_TOKEN: &str = "owner";

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn fresh(&self) -> bool {
        Instant::now() + REFRESH_AHEAD < self.expires_at
    }

    fn unexpired(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    /// Emulator mode
    Fixed(String),
}

pub struct TokenCache {
    source: TokenSource,
    current: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            source: TokenSource::Provider(auth),
            current: RwLock::new(None),
        }
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Fixed(token.into()),
            current: RwLock::new(None),
        }
    }

    /// Forget the current token, e.g. after the server rejected it.
    pub async fn invalidate(&self) {
        self.current.write().await.take();
    }

    pub async fn get_token(&self) -> FirestoreResult<String> {
        let provider = match &self.source {
            TokenSource::Fixed(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        if let Some(token) = self.current.read().await.as_ref().filter(|t| t.fresh()) {
            return Ok(token.value.clone());
        }

        let mut current = self.current.write().await;
        if let Some(token) = current.as_ref().filter(|t| t.fresh()) {
            return Ok(token.value.clone());
        }

        match provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                // An already-expired token is handed out once and refreshed
                // on the next call.
                let remaining = (token.expires_at() - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                let expires_at = Instant::now() + remaining;
                let value = token.as_str().to_string();
                *current = Some(AccessToken {
                    value: value.clone(),
                    expires_at,
                });
                debug!("Refreshed Firestore access token");
                Ok(value)
            }
            Err(e) => match current.as_ref().filter(|t| t.unexpired()) {
                Some(token) => {
                    warn!("Token refresh failed, keeping current token: {}", e);
                    Ok(token.value.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness() {
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!token.fresh());
        assert!(token.unexpired());

        let token = AccessToken {
            value: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(50 * 60),
        };
        assert!(token.fresh());
    }

    #[tokio::test]
    async fn test_fixed_token_survives_invalidate() {
        let cache = TokenCache::fixed(EMULATOR_TOKEN);
        assert_eq!(cache.get_token().await.unwrap(), "owner");
        cache.invalidate().await;
        assert_eq!(cache.get_token().await.unwrap(), "owner");
    }
}
