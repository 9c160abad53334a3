//! Draft and submitted application records.
//!
//! A [`Draft`] exists per applicant email while the form is incomplete. On
//! finalize it is converted into an [`Application`] and removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{ApplicantFields, Field};
use crate::step::FormStep;

/// In-progress application, one per email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Applicant email (document key, immutable)
    pub email: String,

    /// Form values saved so far
    pub fields: ApplicantFields,

    #[serde(default)]
    pub step1_completed: bool,

    #[serde(default)]
    pub step2_completed: bool,

    #[serde(default)]
    pub step3_completed: bool,

    /// When the draft was last saved
    pub last_updated: DateTime<Utc>,

    /// Always true while stored as a draft
    #[serde(default = "default_true")]
    pub is_draft: bool,
}

fn default_true() -> bool {
    true
}

impl Draft {
    /// Create an empty draft for an email.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        let fields = ApplicantFields::default().with(Field::Email, email.clone());
        Self {
            email,
            fields,
            step1_completed: false,
            step2_completed: false,
            step3_completed: false,
            last_updated: Utc::now(),
            is_draft: true,
        }
    }

    pub fn is_step_completed(&self, step: FormStep) -> bool {
        match step {
            FormStep::Personal => self.step1_completed,
            FormStep::Contact => self.step2_completed,
            FormStep::Essays => self.step3_completed,
        }
    }

    /// Set a step's completion flag. Flags are never cleared.
    pub fn mark_completed(&mut self, step: FormStep) {
        match step {
            FormStep::Personal => self.step1_completed = true,
            FormStep::Contact => self.step2_completed = true,
            FormStep::Essays => self.step3_completed = true,
        }
    }

    /// Steps whose flag is still false.
    pub fn incomplete_steps(&self) -> Vec<FormStep> {
        FormStep::ALL
            .into_iter()
            .filter(|s| !self.is_step_completed(*s))
            .collect()
    }

    pub fn all_steps_completed(&self) -> bool {
        self.incomplete_steps().is_empty()
    }

    /// Highest step whose flag is set.
    pub fn highest_completed(&self) -> Option<FormStep> {
        FormStep::ALL
            .into_iter()
            .rev()
            .find(|s| self.is_step_completed(*s))
    }

    /// Step a returning applicant resumes at.
    ///
    /// One past the highest completed step, capped at the last step. A draft
    /// with every step complete but not yet finalized resumes at step 3 for
    /// review.
    pub fn resume_step(&self) -> FormStep {
        match self.highest_completed() {
            Some(step) => step.next(),
            None => FormStep::Personal,
        }
    }

    /// Merge form values into the draft. The key email always wins over an
    /// email carried in the payload.
    pub fn apply_fields(&mut self, fields: &ApplicantFields) {
        self.fields.merge(fields);
        self.fields.set(Field::Email, Some(self.email.clone()));
    }

    /// Apply a save to the draft.
    pub fn apply_patch(&mut self, patch: &DraftPatch) {
        self.apply_fields(&patch.fields);
        if let Some(step) = patch.completed {
            self.mark_completed(step);
        }
        self.last_updated = patch.saved_at;
        self.is_draft = true;
    }

    /// Drop the draft bookkeeping and produce the permanent record.
    pub fn into_application(self, submitted_at: DateTime<Utc>) -> Application {
        let mut fields = self.fields;
        fields.set(Field::Email, Some(self.email.clone()));
        Application {
            email: self.email,
            fields,
            submitted_at,
        }
    }
}

/// One save against a draft.
///
/// Only the fields present in `fields` are written. `completed` is set by
/// the step-advance path only; autosave leaves it `None` so existing flags
/// are never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftPatch {
    pub fields: ApplicantFields,
    pub completed: Option<FormStep>,
    pub saved_at: DateTime<Utc>,
}

impl DraftPatch {
    /// Build a patch for `email`. The key email replaces any email in
    /// `fields`.
    pub fn new(email: &str, fields: &ApplicantFields, completed: Option<FormStep>) -> Self {
        let mut fields = fields.clone();
        fields.set(Field::Email, Some(email.to_string()));
        Self {
            fields,
            completed,
            saved_at: Utc::now(),
        }
    }
}

/// Finalized submission, one per email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub email: String,

    pub fields: ApplicantFields,

    pub submitted_at: DateTime<Utc>,
}

/// Where an applicant stands in the submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApplicationPhase {
    /// No draft and no application yet
    New,
    /// A draft exists; `step` is where the wizard resumes
    InProgress { step: FormStep },
    /// The application was submitted in this session
    Submitted,
    /// An application already exists for this email; read-only
    Duplicate,
}

impl ApplicationPhase {
    /// True if no further writes are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Duplicate)
    }

    /// Step the wizard shows, if any.
    pub fn current_step(&self) -> Option<FormStep> {
        match self {
            Self::New => Some(FormStep::Personal),
            Self::InProgress { step } => Some(*step),
            Self::Submitted | Self::Duplicate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_draft_carries_email() {
        let draft = Draft::new("a@x.com");
        assert!(draft.is_draft);
        assert_eq!(draft.fields.get(Field::Email), Some("a@x.com"));
        assert_eq!(draft.incomplete_steps(), FormStep::ALL.to_vec());
    }

    #[test]
    fn test_resume_step() {
        let mut draft = Draft::new("a@x.com");
        assert_eq!(draft.resume_step(), FormStep::Personal);

        draft.mark_completed(FormStep::Personal);
        assert_eq!(draft.resume_step(), FormStep::Contact);

        draft.mark_completed(FormStep::Contact);
        assert_eq!(draft.resume_step(), FormStep::Essays);

        draft.mark_completed(FormStep::Essays);
        assert_eq!(draft.resume_step(), FormStep::Essays);
    }

    #[test]
    fn test_resume_uses_highest_flag_even_with_gaps() {
        let mut draft = Draft::new("a@x.com");
        draft.mark_completed(FormStep::Contact);
        assert_eq!(draft.highest_completed(), Some(FormStep::Contact));
        assert_eq!(draft.resume_step(), FormStep::Essays);
    }

    #[test]
    fn test_apply_fields_keeps_key_email() {
        let mut draft = Draft::new("a@x.com");
        let patch = ApplicantFields::default()
            .with(Field::Email, "other@x.com")
            .with(Field::Nama, "A");
        draft.apply_fields(&patch);
        assert_eq!(draft.fields.get(Field::Email), Some("a@x.com"));
        assert_eq!(draft.fields.get(Field::Nama), Some("A"));
    }

    #[test]
    fn test_patch_accumulates_flags() {
        let mut draft = Draft::new("a@x.com");
        draft.apply_patch(&DraftPatch::new(
            "a@x.com",
            &ApplicantFields::default().with(Field::Nama, "A"),
            Some(FormStep::Personal),
        ));
        draft.apply_patch(&DraftPatch::new(
            "a@x.com",
            &ApplicantFields::default().with(Field::IgUsername, "@a"),
            None,
        ));

        assert!(draft.step1_completed);
        assert!(!draft.step2_completed);
        assert_eq!(draft.fields.get(Field::Nama), Some("A"));
        assert_eq!(draft.fields.get(Field::IgUsername), Some("@a"));
    }

    #[test]
    fn test_patch_overrides_payload_email() {
        let patch = DraftPatch::new(
            "a@x.com",
            &ApplicantFields::default().with(Field::Email, "b@x.com"),
            None,
        );
        assert_eq!(patch.fields.get(Field::Email), Some("a@x.com"));
    }

    #[test]
    fn test_into_application_strips_bookkeeping() {
        let mut draft = Draft::new("a@x.com");
        draft.apply_fields(&ApplicantFields::default().with(Field::Npm, "1"));
        for step in FormStep::ALL {
            draft.mark_completed(step);
        }

        let app = draft.into_application(Utc::now());
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["fields"]["npm"], "1");
        assert_eq!(json["fields"]["email"], "a@x.com");
        for key in ["is_draft", "step1_completed", "step2_completed", "step3_completed", "last_updated"] {
            assert!(json.get(key).is_none(), "{} should be stripped", key);
        }
    }

    #[test]
    fn test_phase_serialization() {
        let phase = ApplicationPhase::InProgress {
            step: FormStep::Contact,
        };
        let json = serde_json::to_value(phase).unwrap();
        assert_eq!(json["state"], "in_progress");
        assert_eq!(json["step"], 2);
        assert!(ApplicationPhase::Duplicate.is_terminal());
        assert_eq!(ApplicationPhase::New.current_step(), Some(FormStep::Personal));
    }
}
