//! Draft repository: one `form_drafts` document per applicant email.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use digi_models::{ApplicantFields, Draft, DraftPatch, Field, FormStep};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

/// Collection holding in-progress drafts.
pub const DRAFTS_COLLECTION: &str = "form_drafts";

const LAST_UPDATED: &str = "last_updated";
const IS_DRAFT: &str = "is_draft";

/// Repository for draft documents.
#[derive(Clone)]
pub struct DraftRepository {
    client: FirestoreClient,
}

impl DraftRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get the draft for an email, if one exists.
    pub async fn get(&self, email: &str) -> FirestoreResult<Option<Draft>> {
        let doc = self
            .client
            .with_retry("get_draft", || self.client.get_document(DRAFTS_COLLECTION, email))
            .await?;

        doc.map(|d| document_to_draft(&d, email)).transpose()
    }

    /// Create a draft. Fails with `AlreadyExists` if one is already stored.
    pub async fn create(&self, draft: &Draft) -> FirestoreResult<()> {
        let fields = draft_to_fields(draft);
        self.client
            .create_document(DRAFTS_COLLECTION, &draft.email, fields)
            .await?;
        info!("Created draft for {}", draft.email);
        Ok(())
    }

    /// Write a patch onto an existing draft.
    ///
    /// Only the patched fields, the patched completion flag, `last_updated`
    /// and `is_draft` are written; every other stored value is preserved.
    pub async fn update(&self, email: &str, patch: &DraftPatch) -> FirestoreResult<()> {
        let (fields, mask) = patch_to_fields(patch);
        self.client
            .with_retry("update_draft", || {
                self.client
                    .update_document(DRAFTS_COLLECTION, email, fields.clone(), &mask)
            })
            .await?;
        debug!(
            email = %email,
            completed = ?patch.completed.map(|s| s.number()),
            "Updated draft"
        );
        Ok(())
    }

    /// Delete the draft for an email. Deleting a missing draft succeeds.
    pub async fn delete(&self, email: &str) -> FirestoreResult<()> {
        self.client
            .with_retry("delete_draft", || {
                self.client.delete_document(DRAFTS_COLLECTION, email)
            })
            .await?;
        info!("Deleted draft for {}", email);
        Ok(())
    }
}

/// Applicant fields stored as top-level document keys.
pub(crate) fn applicant_fields_to_values(fields: &ApplicantFields) -> HashMap<String, Value> {
    fields
        .iter()
        .map(|(field, value)| (field.as_str().to_string(), value.to_firestore_value()))
        .collect()
}

pub(crate) fn applicant_fields_from_document(doc: &Document) -> ApplicantFields {
    let mut fields = ApplicantFields::default();
    for field in Field::ALL {
        fields.set(field, doc.get::<String>(field.as_str()));
    }
    fields
}

fn draft_to_fields(draft: &Draft) -> HashMap<String, Value> {
    let mut fields = applicant_fields_to_values(&draft.fields);
    fields.insert(Field::Email.as_str().to_string(), draft.email.to_firestore_value());
    for step in FormStep::ALL {
        fields.insert(
            step.completion_field().to_string(),
            draft.is_step_completed(step).to_firestore_value(),
        );
    }
    fields.insert(LAST_UPDATED.to_string(), draft.last_updated.to_firestore_value());
    fields.insert(IS_DRAFT.to_string(), true.to_firestore_value());
    fields
}

/// Fields and update mask for a patch.
fn patch_to_fields(patch: &DraftPatch) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = applicant_fields_to_values(&patch.fields);
    if let Some(step) = patch.completed {
        fields.insert(step.completion_field().to_string(), true.to_firestore_value());
    }
    fields.insert(LAST_UPDATED.to_string(), patch.saved_at.to_firestore_value());
    fields.insert(IS_DRAFT.to_string(), true.to_firestore_value());

    let mut mask: Vec<String> = fields.keys().cloned().collect();
    mask.sort();
    (fields, mask)
}

fn document_to_draft(doc: &Document, email: &str) -> FirestoreResult<Draft> {
    if doc.fields.is_none() {
        return Err(FirestoreError::InvalidResponse(format!(
            "Draft {} has no fields",
            email
        )));
    }

    let mut fields = applicant_fields_from_document(doc);
    fields.set(Field::Email, Some(email.to_string()));
    let flag = |step: FormStep| doc.get::<bool>(step.completion_field()).unwrap_or(false);

    Ok(Draft {
        email: email.to_string(),
        fields,
        step1_completed: flag(FormStep::Personal),
        step2_completed: flag(FormStep::Contact),
        step3_completed: flag(FormStep::Essays),
        last_updated: doc
            .get::<chrono::DateTime<Utc>>(LAST_UPDATED)
            .unwrap_or_else(Utc::now),
        is_draft: doc.get::<bool>(IS_DRAFT).unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_mask_names_only_written_keys() {
        let patch = DraftPatch::new(
            "a@x.com",
            &ApplicantFields::default().with(Field::Nama, "A"),
            Some(FormStep::Contact),
        );
        let (fields, mask) = patch_to_fields(&patch);

        assert_eq!(
            mask,
            vec!["email", "is_draft", "last_updated", "nama", "step2_completed"]
        );
        assert_eq!(fields.len(), mask.len());
        assert!(!mask.iter().any(|k| k == "step1_completed"));
    }

    #[test]
    fn test_autosave_patch_touches_no_flag() {
        let patch = DraftPatch::new("a@x.com", &ApplicantFields::default(), None);
        let (_, mask) = patch_to_fields(&patch);
        assert!(mask.iter().all(|k| !k.ends_with("_completed")));
    }

    #[test]
    fn test_draft_document_roundtrip() {
        let mut draft = Draft::new("a@x.com");
        draft.apply_fields(&ApplicantFields::default().with(Field::Npm, "2306"));
        draft.mark_completed(FormStep::Personal);

        let doc = Document::new(draft_to_fields(&draft));
        let loaded = document_to_draft(&doc, "a@x.com").unwrap();

        assert_eq!(loaded.fields, draft.fields);
        assert!(loaded.step1_completed);
        assert!(!loaded.step3_completed);
        assert!(loaded.is_draft);
    }

    #[test]
    fn test_document_without_fields_is_invalid() {
        let doc = Document::default();
        assert!(matches!(
            document_to_draft(&doc, "a@x.com"),
            Err(FirestoreError::InvalidResponse(_))
        ));
    }
}
