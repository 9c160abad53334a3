//! Draft persistence with upsert-by-email semantics.

use std::sync::Arc;

use tracing::{debug, info};

use digi_models::{ApplicantFields, Draft, DraftPatch, FormStep};

use super::store::{DraftStore, StoreError, StoreResult};
use crate::metrics;

/// Saves and loads drafts.
#[derive(Clone)]
pub struct ProgressService {
    drafts: Arc<dyn DraftStore>,
}

impl ProgressService {
    pub fn new(drafts: Arc<dyn DraftStore>) -> Self {
        Self { drafts }
    }

    /// Load the saved draft, if any.
    pub async fn get_progress(&self, email: &str) -> StoreResult<Option<Draft>> {
        self.drafts.get_draft(email).await
    }

    /// Save fields after `step` passed validation and mark it completed.
    pub async fn save_progress(
        &self,
        email: &str,
        step: FormStep,
        fields: &ApplicantFields,
    ) -> StoreResult<Draft> {
        let draft = self
            .upsert(email, DraftPatch::new(email, fields, Some(step)))
            .await?;
        info!(email = %email, step = step.number(), "Saved step progress");
        metrics::record_draft_saved("step");
        Ok(draft)
    }

    /// Save in-progress fields without touching completion flags.
    pub async fn autosave(&self, email: &str, fields: &ApplicantFields) -> StoreResult<Draft> {
        let draft = self.upsert(email, DraftPatch::new(email, fields, None)).await?;
        debug!(email = %email, "Autosaved draft");
        metrics::record_draft_saved("autosave");
        Ok(draft)
    }

    /// Update the stored draft, or insert one if none exists.
    ///
    /// Two first saves racing on the insert fall back to an update. A draft
    /// that vanishes between the lookup and the update was consumed by
    /// finalize, so the `NotFound` is returned rather than recreating it.
    async fn upsert(&self, email: &str, patch: DraftPatch) -> StoreResult<Draft> {
        if let Some(mut draft) = self.drafts.get_draft(email).await? {
            self.drafts.update_draft(email, &patch).await?;
            draft.apply_patch(&patch);
            return Ok(draft);
        }

        let mut draft = Draft::new(email);
        draft.apply_patch(&patch);
        match self.drafts.insert_draft(&draft).await {
            Ok(()) => Ok(draft),
            Err(StoreError::AlreadyExists(_)) => {
                self.drafts.update_draft(email, &patch).await?;
                Ok(self.drafts.get_draft(email).await?.unwrap_or(draft))
            }
            Err(e) => Err(e),
        }
    }
}
