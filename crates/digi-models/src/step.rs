//! Wizard steps.

use serde::{Deserialize, Serialize};

use crate::fields::Field;

/// One of the three ordered form sections.
///
/// Serialized as its step number (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FormStep {
    /// Step 1: personal information
    Personal,
    /// Step 2: contact information and uploads
    Contact,
    /// Step 3: essay questions
    Essays,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::Personal, FormStep::Contact, FormStep::Essays];

    /// Look up a step by its number.
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::Personal),
            2 => Some(Self::Contact),
            3 => Some(Self::Essays),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::Personal => 1,
            Self::Contact => 2,
            Self::Essays => 3,
        }
    }

    /// Fields that must be non-blank for this step to validate.
    pub fn required_fields(&self) -> &'static [Field] {
        match self {
            Self::Personal => &[Field::Nama, Field::Email, Field::Npm, Field::Angkatan],
            Self::Contact => &[
                Field::CvUrl,
                Field::FotoUrl,
                Field::IgUsername,
                Field::LineUsername,
                Field::DiscordUsername,
            ],
            Self::Essays => &[Field::Question1, Field::Question2, Field::Question3],
        }
    }

    /// The following step; the last step stays put.
    pub fn next(&self) -> Self {
        match self {
            Self::Personal => Self::Contact,
            Self::Contact | Self::Essays => Self::Essays,
        }
    }

    /// Name of the stored completion flag.
    pub fn completion_field(&self) -> &'static str {
        match self {
            Self::Personal => "step1_completed",
            Self::Contact => "step2_completed",
            Self::Essays => "step3_completed",
        }
    }
}

impl From<FormStep> for u8 {
    fn from(step: FormStep) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for FormStep {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value as u32).ok_or_else(|| format!("invalid step number {}", value))
    }
}

impl std::fmt::Display for FormStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_numbers() {
        for step in FormStep::ALL {
            assert_eq!(FormStep::from_number(step.number() as u32), Some(step));
        }
        assert_eq!(FormStep::from_number(0), None);
        assert_eq!(FormStep::from_number(4), None);
    }

    #[test]
    fn test_next_is_capped() {
        assert_eq!(FormStep::Personal.next(), FormStep::Contact);
        assert_eq!(FormStep::Contact.next(), FormStep::Essays);
        assert_eq!(FormStep::Essays.next(), FormStep::Essays);
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&FormStep::Contact).unwrap(), "2");
        let step: FormStep = serde_json::from_str("3").unwrap();
        assert_eq!(step, FormStep::Essays);
        assert!(serde_json::from_str::<FormStep>("7").is_err());
    }

    #[test]
    fn test_question_4_is_optional() {
        assert!(!FormStep::Essays.required_fields().contains(&Field::Question4));
    }
}
