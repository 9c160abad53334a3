//! Per-step validation rules.

use serde::{Deserialize, Serialize};

use crate::fields::{ApplicantFields, Field};
use crate::step::FormStep;

/// Message returned for a step number outside 1..=3.
pub const INVALID_STEP_MESSAGE: &str = "Invalid step number";

/// Outcome of validating one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<Field>,
}

impl StepValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            missing_fields: Vec::new(),
        }
    }

    fn invalid_step() -> Self {
        Self {
            valid: false,
            message: Some(INVALID_STEP_MESSAGE.to_string()),
            missing_fields: Vec::new(),
        }
    }

    fn missing(fields: Vec<Field>) -> Self {
        let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        Self {
            valid: false,
            message: Some(format!("Missing required fields: {}", names.join(", "))),
            missing_fields: fields,
        }
    }
}

/// Validate the fields required by `step_number`.
///
/// A field is missing when it is absent or blank after trimming. Missing
/// fields are reported in rule order.
pub fn validate_step(step_number: u32, fields: &ApplicantFields) -> StepValidation {
    let Some(step) = FormStep::from_number(step_number) else {
        return StepValidation::invalid_step();
    };

    let missing: Vec<Field> = step
        .required_fields()
        .iter()
        .copied()
        .filter(|f| fields.is_blank(*f))
        .collect();

    if missing.is_empty() {
        StepValidation::ok()
    } else {
        StepValidation::missing(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step1_fields() -> ApplicantFields {
        ApplicantFields::default()
            .with(Field::Nama, "A")
            .with(Field::Email, "a@x.com")
            .with(Field::Npm, "1")
            .with(Field::Angkatan, "2024")
    }

    #[test]
    fn test_step1_complete() {
        let result = validate_step(1, &step1_fields());
        assert!(result.valid);
        assert!(result.message.is_none());
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn test_blank_after_trim_is_missing() {
        let mut fields = step1_fields();
        fields.set(Field::Npm, Some("   ".to_string()));
        fields.set(Field::Angkatan, None);

        let result = validate_step(1, &fields);
        assert!(!result.valid);
        assert_eq!(result.missing_fields, vec![Field::Npm, Field::Angkatan]);
        assert_eq!(
            result.message.as_deref(),
            Some("Missing required fields: npm, angkatan")
        );
    }

    #[test]
    fn test_step2_lists_every_missing_field() {
        let fields = ApplicantFields::default().with(Field::IgUsername, "@a");
        let result = validate_step(2, &fields);
        assert!(!result.valid);
        assert_eq!(
            result.missing_fields,
            vec![
                Field::CvUrl,
                Field::FotoUrl,
                Field::LineUsername,
                Field::DiscordUsername
            ]
        );
    }

    #[test]
    fn test_step3_ignores_question_4() {
        let fields = ApplicantFields::default()
            .with(Field::Question1, "a")
            .with(Field::Question2, "b")
            .with(Field::Question3, "c");
        assert!(validate_step(3, &fields).valid);
    }

    #[test]
    fn test_unknown_step() {
        for n in [0, 4, 99] {
            let result = validate_step(n, &step1_fields());
            assert!(!result.valid);
            assert_eq!(result.message.as_deref(), Some(INVALID_STEP_MESSAGE));
            assert!(result.missing_fields.is_empty());
        }
    }

    #[test]
    fn test_valid_iff_all_required_present() {
        for step in FormStep::ALL {
            let mut fields = ApplicantFields::default();
            for field in step.required_fields() {
                assert!(!validate_step(step.number() as u32, &fields).valid);
                fields.set(*field, Some("x".to_string()));
            }
            assert!(validate_step(step.number() as u32, &fields).valid);
        }
    }
}
