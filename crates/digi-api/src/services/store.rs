//! Storage contracts the lifecycle runs against.
//!
//! Handlers and services only see [`DraftStore`] and [`ApplicationStore`].
//! [`FirestoreStore`] backs both with the Firestore repositories.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use digi_firestore::{
    ApplicationRepository, DraftRepository, FirestoreClient, FirestoreError,
};
use digi_models::{Application, Draft, DraftPatch};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record the write would create already exists
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Firestore(FirestoreError),
}

impl From<FirestoreError> for StoreError {
    fn from(err: FirestoreError) -> Self {
        if err.is_conflict() {
            Self::AlreadyExists(err.to_string())
        } else if let FirestoreError::NotFound(path) = err {
            Self::NotFound(path)
        } else {
            Self::Firestore(err)
        }
    }
}

/// Draft persistence, keyed by applicant email.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Load a draft. A miss is `Ok(None)`.
    async fn get_draft(&self, email: &str) -> StoreResult<Option<Draft>>;

    /// Insert a new draft. Fails with `AlreadyExists` if one is stored.
    async fn insert_draft(&self, draft: &Draft) -> StoreResult<()>;

    /// Write the patched fields of an existing draft. Fails with
    /// `NotFound` if no draft is stored.
    async fn update_draft(&self, email: &str, patch: &DraftPatch) -> StoreResult<()>;

    /// Remove a draft. Removing a missing draft succeeds.
    async fn delete_draft(&self, email: &str) -> StoreResult<()>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Submitted applications, keyed by applicant email.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn get_application(&self, email: &str) -> StoreResult<Option<Application>>;

    /// Create the application and delete the draft with the same email as
    /// one atomic write. Fails with `AlreadyExists` if an application is
    /// already stored, in which case nothing is written.
    async fn insert_consuming_draft(&self, application: &Application) -> StoreResult<()>;
}

/// Firestore-backed store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
    drafts: DraftRepository,
    applications: ApplicationRepository,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            drafts: DraftRepository::new(client.clone()),
            applications: ApplicationRepository::new(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl DraftStore for FirestoreStore {
    async fn get_draft(&self, email: &str) -> StoreResult<Option<Draft>> {
        Ok(self.drafts.get(email).await?)
    }

    async fn insert_draft(&self, draft: &Draft) -> StoreResult<()> {
        Ok(self.drafts.create(draft).await?)
    }

    async fn update_draft(&self, email: &str, patch: &DraftPatch) -> StoreResult<()> {
        Ok(self.drafts.update(email, patch).await?)
    }

    async fn delete_draft(&self, email: &str) -> StoreResult<()> {
        Ok(self.drafts.delete(email).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        // Any answer from the document endpoint, including a miss, means
        // the project is reachable and the credentials work.
        self.client.get_document("_health", "_check").await?;
        debug!("Firestore reachable");
        Ok(())
    }
}

#[async_trait]
impl ApplicationStore for FirestoreStore {
    async fn get_application(&self, email: &str) -> StoreResult<Option<Application>> {
        Ok(self.applications.get(email).await?)
    }

    async fn insert_consuming_draft(&self, application: &Application) -> StoreResult<()> {
        Ok(self.applications.create_consuming_draft(application).await?)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-process store for service and router tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        drafts: Mutex<HashMap<String, Draft>>,
        applications: Mutex<HashMap<String, Application>>,
        /// Application that appears just before the next commit
        racing_application: Mutex<Option<Application>>,
        /// Draft removal that lands just before the next update
        racing_delete: AtomicBool,
        draft_writes: AtomicUsize,
        application_inserts: AtomicUsize,
    }

    impl MemoryStore {
        pub fn seed_draft(&self, draft: Draft) {
            self.drafts.lock().unwrap().insert(draft.email.clone(), draft);
        }

        pub fn seed_application(&self, application: Application) {
            self.applications
                .lock()
                .unwrap()
                .insert(application.email.clone(), application);
        }

        /// Simulate another request finalizing between our read and commit.
        pub fn race_application_on_commit(&self, application: Application) {
            *self.racing_application.lock().unwrap() = Some(application);
        }

        /// Simulate finalize consuming the draft between a save's lookup and
        /// its update.
        pub fn drop_draft_before_next_update(&self) {
            self.racing_delete.store(true, Ordering::SeqCst);
        }

        pub fn draft(&self, email: &str) -> Option<Draft> {
            self.drafts.lock().unwrap().get(email).cloned()
        }

        pub fn application(&self, email: &str) -> Option<Application> {
            self.applications.lock().unwrap().get(email).cloned()
        }

        pub fn draft_writes(&self) -> usize {
            self.draft_writes.load(Ordering::SeqCst)
        }

        pub fn application_inserts(&self) -> usize {
            self.application_inserts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DraftStore for MemoryStore {
        async fn get_draft(&self, email: &str) -> StoreResult<Option<Draft>> {
            Ok(self.draft(email))
        }

        async fn insert_draft(&self, draft: &Draft) -> StoreResult<()> {
            let mut drafts = self.drafts.lock().unwrap();
            if drafts.contains_key(&draft.email) {
                return Err(StoreError::AlreadyExists(draft.email.clone()));
            }
            drafts.insert(draft.email.clone(), draft.clone());
            self.draft_writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn update_draft(&self, email: &str, patch: &DraftPatch) -> StoreResult<()> {
            let mut drafts = self.drafts.lock().unwrap();
            if self.racing_delete.swap(false, Ordering::SeqCst) {
                drafts.remove(email);
            }
            let draft = drafts
                .get_mut(email)
                .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
            draft.apply_patch(patch);
            self.draft_writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_draft(&self, email: &str) -> StoreResult<()> {
            self.drafts.lock().unwrap().remove(email);
            Ok(())
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ApplicationStore for MemoryStore {
        async fn get_application(&self, email: &str) -> StoreResult<Option<Application>> {
            Ok(self.application(email))
        }

        async fn insert_consuming_draft(&self, application: &Application) -> StoreResult<()> {
            if let Some(racing) = self.racing_application.lock().unwrap().take() {
                self.seed_application(racing);
            }
            let mut applications = self.applications.lock().unwrap();
            if applications.contains_key(&application.email) {
                return Err(StoreError::AlreadyExists(application.email.clone()));
            }
            applications.insert(application.email.clone(), application.clone());
            self.drafts.lock().unwrap().remove(&application.email);
            self.application_inserts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firestore_conflicts_become_already_exists() {
        let err: StoreError = FirestoreError::AlreadyExists("applicants/a".into()).into();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let err: StoreError = FirestoreError::PreconditionFailed("exists".into()).into();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_firestore_not_found_is_kept() {
        let err: StoreError = FirestoreError::not_found("form_drafts/a").into();
        assert!(matches!(err, StoreError::NotFound(path) if path == "form_drafts/a"));

        let err: StoreError = FirestoreError::ServerError(503, "down".into()).into();
        assert!(matches!(err, StoreError::Firestore(_)));
    }
}
