//! Application repository: one `applicants` document per submitted email.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use digi_models::{Application, Field};

use crate::client::FirestoreClient;
use crate::draft_repo::{applicant_fields_from_document, applicant_fields_to_values, DRAFTS_COLLECTION};
use crate::error::FirestoreResult;
use crate::types::{Document, ToFirestoreValue, Value, Write};

/// Collection holding submitted applications.
pub const APPLICATIONS_COLLECTION: &str = "applicants";

const SUBMITTED_AT: &str = "submitted_at";

/// Repository for submitted applications.
#[derive(Clone)]
pub struct ApplicationRepository {
    client: FirestoreClient,
}

impl ApplicationRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get the application for an email, if one was submitted.
    pub async fn get(&self, email: &str) -> FirestoreResult<Option<Application>> {
        let doc = self
            .client
            .with_retry("get_application", || {
                self.client.get_document(APPLICATIONS_COLLECTION, email)
            })
            .await?;

        Ok(doc.map(|d| document_to_application(&d, email)))
    }

    /// Store the application and delete the applicant's draft in one
    /// atomic commit.
    ///
    /// The application write carries a must-not-exist precondition, so a
    /// second submission for the same email fails with `AlreadyExists` or
    /// `PreconditionFailed` and leaves both documents untouched.
    pub async fn create_consuming_draft(&self, application: &Application) -> FirestoreResult<()> {
        let email = application.email.as_str();
        let app_name = self.client.full_document_name(APPLICATIONS_COLLECTION, email);
        let draft_name = self.client.full_document_name(DRAFTS_COLLECTION, email);
        let fields = application_to_fields(application);

        // Not retried: a lost response would turn the retry into a conflict.
        self.client
            .commit(vec![
                Write::create(Document::named(app_name, fields)),
                Write::delete(draft_name),
            ])
            .await?;

        info!("Submitted application for {}", email);
        Ok(())
    }
}

fn application_to_fields(application: &Application) -> HashMap<String, Value> {
    let mut fields = applicant_fields_to_values(&application.fields);
    fields.insert(
        Field::Email.as_str().to_string(),
        application.email.to_firestore_value(),
    );
    fields.insert(
        SUBMITTED_AT.to_string(),
        application.submitted_at.to_firestore_value(),
    );
    fields
}

fn document_to_application(doc: &Document, email: &str) -> Application {
    let mut fields = applicant_fields_from_document(doc);
    fields.set(Field::Email, Some(email.to_string()));

    Application {
        email: email.to_string(),
        fields,
        submitted_at: doc
            .get::<chrono::DateTime<Utc>>(SUBMITTED_AT)
            .unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digi_models::ApplicantFields;

    #[test]
    fn test_application_fields_have_no_draft_bookkeeping() {
        let app = Application {
            email: "a@x.com".to_string(),
            fields: ApplicantFields::default().with(Field::Question1, "why"),
            submitted_at: Utc::now(),
        };
        let fields = application_to_fields(&app);

        assert!(fields.contains_key("question_1"));
        assert!(fields.contains_key("submitted_at"));
        for key in ["is_draft", "last_updated", "step1_completed", "step3_completed"] {
            assert!(!fields.contains_key(key));
        }
    }
}
