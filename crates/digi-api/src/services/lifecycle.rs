//! Application lifecycle controller.
//!
//! Drives one applicant from an empty form to a submitted application:
//! session start, per-step advance, autosave, and finalize. Once an
//! application exists for an email every write is rejected.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use digi_models::{
    validate_step, ApplicantFields, Application, ApplicationPhase, Draft, Field, FormStep,
    SessionUser, StepValidation,
};

use super::autosave::AutosaveScheduler;
use super::progress::ProgressService;
use super::store::{ApplicationStore, DraftStore, StoreError};
use crate::metrics;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{}", .0.message.as_deref().unwrap_or("Validation failed"))]
    Validation(StepValidation),

    #[error("No draft found. Please save your progress first.")]
    DraftNotFound,

    #[error("Please complete all steps before finalizing your application.")]
    IncompleteSteps(Vec<FormStep>),

    #[error("An application has already been submitted for this email")]
    DuplicateSubmission,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the wizard shows when an applicant arrives.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub phase: ApplicationPhase,
    /// Step the wizard opens on; absent once submitted
    pub step: Option<FormStep>,
    /// True when no further writes are accepted
    pub read_only: bool,
    /// Form values to show, prefilled from the profile when new
    pub fields: ApplicantFields,
    pub completed_steps: Vec<FormStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
}

impl SessionStart {
    fn new(
        phase: ApplicationPhase,
        fields: ApplicantFields,
        completed_steps: Vec<FormStep>,
        application: Option<Application>,
    ) -> Self {
        Self {
            phase,
            step: phase.current_step(),
            read_only: phase.is_terminal(),
            fields,
            completed_steps,
            application,
        }
    }
}

/// A finalized application and the phase the applicant is now in.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub phase: ApplicationPhase,
    pub application: Application,
}

/// Result of a successful step advance.
#[derive(Debug, Clone, Serialize)]
pub struct StepAdvance {
    pub draft: Draft,
    /// Step to show next; stays at the last step until finalize
    pub next_step: FormStep,
}

#[derive(Clone)]
pub struct LifecycleService {
    progress: ProgressService,
    drafts: Arc<dyn DraftStore>,
    applications: Arc<dyn ApplicationStore>,
    autosave: AutosaveScheduler,
}

impl LifecycleService {
    pub fn new(
        drafts: Arc<dyn DraftStore>,
        applications: Arc<dyn ApplicationStore>,
        autosave: AutosaveScheduler,
    ) -> Self {
        Self {
            progress: ProgressService::new(Arc::clone(&drafts)),
            drafts,
            applications,
            autosave,
        }
    }

    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    pub fn autosave_scheduler(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    /// Decide where the applicant starts.
    pub async fn start_session(&self, user: &SessionUser) -> LifecycleResult<SessionStart> {
        if let Some(application) = self.applications.get_application(&user.email).await? {
            debug!(email = %user.email, "Application already submitted");
            return Ok(SessionStart::new(
                ApplicationPhase::Duplicate,
                application.fields.clone(),
                FormStep::ALL.to_vec(),
                Some(application),
            ));
        }

        let start = match self.progress.get_progress(&user.email).await? {
            Some(draft) => {
                let phase = ApplicationPhase::InProgress {
                    step: draft.resume_step(),
                };
                let completed = FormStep::ALL
                    .into_iter()
                    .filter(|s| draft.is_step_completed(*s))
                    .collect();
                SessionStart::new(phase, prefill(draft.fields, user), completed, None)
            }
            None => SessionStart::new(
                ApplicationPhase::New,
                prefill(ApplicantFields::default(), user),
                Vec::new(),
                None,
            ),
        };
        Ok(start)
    }

    /// Validate a step against the saved draft overlaid with `fields`.
    /// Nothing is written.
    pub async fn check_step(
        &self,
        user: &SessionUser,
        step_number: u32,
        fields: &ApplicantFields,
    ) -> LifecycleResult<StepValidation> {
        let merged = self.merged_fields(&user.email, fields).await?;
        Ok(validate_step(step_number, &merged))
    }

    /// Validate and save a step, then move on.
    ///
    /// A failed validation writes nothing.
    pub async fn advance(
        &self,
        user: &SessionUser,
        step_number: u32,
        fields: &ApplicantFields,
    ) -> LifecycleResult<StepAdvance> {
        self.ensure_not_submitted(&user.email).await?;

        let Some(step) = FormStep::from_number(step_number) else {
            return Err(LifecycleError::Validation(validate_step(step_number, fields)));
        };
        let validation = self.check_step(user, step_number, fields).await?;
        if !validation.valid {
            debug!(email = %user.email, step = step_number, missing = ?validation.missing_fields, "Step rejected");
            return Err(LifecycleError::Validation(validation));
        }

        self.autosave.cancel(&user.email).await;
        let saved = self.progress.save_progress(&user.email, step, fields).await;
        let draft = self.check_saved(&user.email, saved).await?;
        Ok(StepAdvance {
            draft,
            next_step: step.next(),
        })
    }

    /// Save in-progress values now, without validation.
    pub async fn autosave(
        &self,
        user: &SessionUser,
        fields: &ApplicantFields,
    ) -> LifecycleResult<Draft> {
        self.ensure_not_submitted(&user.email).await?;
        let saved = self.progress.autosave(&user.email, fields).await;
        self.check_saved(&user.email, saved).await
    }

    /// Queue a debounced autosave. Failures in the delayed save are logged.
    pub async fn schedule_autosave(
        &self,
        user: &SessionUser,
        fields: ApplicantFields,
    ) -> LifecycleResult<()> {
        self.ensure_not_submitted(&user.email).await?;

        let this = self.clone();
        let session = user.clone();
        self.autosave
            .schedule(&user.email, async move {
                match this.autosave(&session, &fields).await {
                    Ok(_) => {}
                    Err(LifecycleError::DuplicateSubmission) => {
                        debug!(email = %session.email, "Skipped autosave after submission");
                    }
                    Err(e) => warn!(email = %session.email, error = %e, "Autosave failed"),
                }
            })
            .await;
        Ok(())
    }

    /// Turn the completed draft into an application.
    ///
    /// Safe to retry: if the application already exists any leftover draft
    /// is removed and the stored application is returned, whatever the
    /// draft's flags say.
    pub async fn finalize(&self, user: &SessionUser) -> LifecycleResult<Submission> {
        let email = user.email.as_str();
        self.autosave.cancel(email).await;

        let draft = self.progress.get_progress(email).await?;
        if let Some(existing) = self.applications.get_application(email).await? {
            if draft.is_some() {
                warn!(email = %email, "Application exists with a leftover draft; removing draft");
                self.drafts.delete_draft(email).await?;
                metrics::record_submission("recovered");
            } else {
                metrics::record_submission("idempotent");
            }
            return Ok(submitted(existing));
        }

        let Some(draft) = draft else {
            return Err(LifecycleError::DraftNotFound);
        };
        let incomplete = draft.incomplete_steps();
        if !incomplete.is_empty() {
            return Err(LifecycleError::IncompleteSteps(incomplete));
        }

        let application = draft.into_application(Utc::now());
        match self.applications.insert_consuming_draft(&application).await {
            Ok(()) => {
                info!(email = %email, "Application submitted");
                metrics::record_submission("created");
                Ok(submitted(application))
            }
            Err(StoreError::AlreadyExists(detail)) => {
                // Another request finalized first.
                let Some(existing) = self.applications.get_application(email).await? else {
                    return Err(StoreError::AlreadyExists(detail).into());
                };
                self.drafts.delete_draft(email).await?;
                metrics::record_submission("recovered");
                Ok(submitted(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate and save the last step, then finalize.
    pub async fn submit(
        &self,
        user: &SessionUser,
        fields: &ApplicantFields,
    ) -> LifecycleResult<Submission> {
        self.advance(user, u32::from(FormStep::Essays.number()), fields)
            .await?;
        self.finalize(user).await
    }

    async fn ensure_not_submitted(&self, email: &str) -> LifecycleResult<()> {
        if self.applications.get_application(email).await?.is_some() {
            metrics::record_duplicate_rejected();
            return Err(LifecycleError::DuplicateSubmission);
        }
        Ok(())
    }

    /// A draft that disappeared mid-save was consumed by a concurrent
    /// finalize; report the submission instead of the missing record.
    async fn check_saved(
        &self,
        email: &str,
        saved: Result<Draft, StoreError>,
    ) -> LifecycleResult<Draft> {
        match saved {
            Err(StoreError::NotFound(detail)) => {
                self.ensure_not_submitted(email).await?;
                Err(StoreError::NotFound(detail).into())
            }
            other => Ok(other?),
        }
    }

    async fn merged_fields(
        &self,
        email: &str,
        fields: &ApplicantFields,
    ) -> LifecycleResult<ApplicantFields> {
        let mut merged = self
            .progress
            .get_progress(email)
            .await?
            .map(|d| d.fields)
            .unwrap_or_default();
        merged.merge(fields);
        merged.set(Field::Email, Some(email.to_string()));
        Ok(merged)
    }
}

fn submitted(application: Application) -> Submission {
    Submission {
        phase: ApplicationPhase::Submitted,
        application,
    }
}

/// Fill the name and email from the identity profile.
fn prefill(mut fields: ApplicantFields, user: &SessionUser) -> ApplicantFields {
    if fields.is_blank(Field::Nama) {
        if let Some(name) = user.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            fields.set(Field::Nama, Some(name.to_string()));
        }
    }
    fields.set(Field::Email, Some(user.email.clone()));
    fields
}
