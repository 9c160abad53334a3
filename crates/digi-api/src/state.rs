//! Application state.

use std::sync::Arc;

use digi_firestore::FirestoreClient;
use digi_storage::{FileStore, R2Client};

use crate::auth::{JwksCache, TokenVerifier};
use crate::config::ApiConfig;
use crate::identity::IdentityClient;
use crate::middleware::RateLimitState;
use crate::services::{
    ApplicationStore, AutosaveScheduler, DraftStore, FirestoreStore, LifecycleService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Draft store, also pinged by readiness
    pub drafts: Arc<dyn DraftStore>,
    pub files: Arc<dyn FileStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub identity: Arc<IdentityClient>,
    pub lifecycle: LifecycleService,
    pub rate_limits: RateLimitState,
}

impl AppState {
    /// Build state against Firestore, R2 and Firebase Auth from the
    /// environment.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let firestore = FirestoreClient::from_env()?;
        let jwks = JwksCache::new(firestore.config().project_id.clone())?;
        let store = Arc::new(FirestoreStore::new(firestore));
        let files = Arc::new(R2Client::from_env()?);
        let identity = IdentityClient::from_env()?;

        Ok(Self::from_parts(
            config,
            store.clone(),
            store,
            files,
            Arc::new(jwks),
            identity,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        drafts: Arc<dyn DraftStore>,
        applications: Arc<dyn ApplicationStore>,
        files: Arc<dyn FileStore>,
        verifier: Arc<dyn TokenVerifier>,
        identity: IdentityClient,
    ) -> Self {
        let lifecycle = LifecycleService::new(
            Arc::clone(&drafts),
            applications,
            AutosaveScheduler::new(config.autosave_debounce),
        );
        let rate_limits = RateLimitState::new(config.rate_limit_rps, config.rate_limit_burst);

        Self {
            config,
            drafts,
            files,
            verifier,
            identity: Arc::new(identity),
            lifecycle,
            rate_limits,
        }
    }
}
