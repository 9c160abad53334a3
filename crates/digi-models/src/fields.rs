//! Applicant form fields.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Names of the fields collected by the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Nama,
    Email,
    Npm,
    Angkatan,
    CvUrl,
    FotoUrl,
    IgUsername,
    LineUsername,
    DiscordUsername,
    #[serde(rename = "question_1")]
    Question1,
    #[serde(rename = "question_2")]
    Question2,
    #[serde(rename = "question_3")]
    Question3,
    #[serde(rename = "question_4")]
    Question4,
}

impl Field {
    /// Every field, in form order.
    pub const ALL: [Field; 13] = [
        Field::Nama,
        Field::Email,
        Field::Npm,
        Field::Angkatan,
        Field::CvUrl,
        Field::FotoUrl,
        Field::IgUsername,
        Field::LineUsername,
        Field::DiscordUsername,
        Field::Question1,
        Field::Question2,
        Field::Question3,
        Field::Question4,
    ];

    /// Stored field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nama => "nama",
            Self::Email => "email",
            Self::Npm => "npm",
            Self::Angkatan => "angkatan",
            Self::CvUrl => "cv_url",
            Self::FotoUrl => "foto_url",
            Self::IgUsername => "ig_username",
            Self::LineUsername => "line_username",
            Self::DiscordUsername => "discord_username",
            Self::Question1 => "question_1",
            Self::Question2 => "question_2",
            Self::Question3 => "question_3",
            Self::Question4 => "question_4",
        }
    }

    /// Parse a stored field name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values entered in the application form.
///
/// Every field is optional until its step is validated. `Some("")` is a
/// present-but-blank value (e.g. a removed upload) and is distinct from an
/// absent field when merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApplicantFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angkatan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ig_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_4: Option<String>,
}

impl ApplicantFields {
    /// Get a field value.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Set (or clear) a field value.
    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// Fields that carry a value (blank values included).
    pub fn present_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.slot(*f).is_some())
            .collect()
    }

    /// Iterate over present `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    /// Overwrite every field present in `patch`. Absent fields are kept.
    pub fn merge(&mut self, patch: &ApplicantFields) {
        for (field, value) in patch.iter() {
            self.set(field, Some(value.to_string()));
        }
    }

    /// True if the field is absent or blank after trimming.
    pub fn is_blank(&self, field: Field) -> bool {
        self.get(field).map_or(true, |v| v.trim().is_empty())
    }

    /// True if no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Nama => &self.nama,
            Field::Email => &self.email,
            Field::Npm => &self.npm,
            Field::Angkatan => &self.angkatan,
            Field::CvUrl => &self.cv_url,
            Field::FotoUrl => &self.foto_url,
            Field::IgUsername => &self.ig_username,
            Field::LineUsername => &self.line_username,
            Field::DiscordUsername => &self.discord_username,
            Field::Question1 => &self.question_1,
            Field::Question2 => &self.question_2,
            Field::Question3 => &self.question_3,
            Field::Question4 => &self.question_4,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Nama => &mut self.nama,
            Field::Email => &mut self.email,
            Field::Npm => &mut self.npm,
            Field::Angkatan => &mut self.angkatan,
            Field::CvUrl => &mut self.cv_url,
            Field::FotoUrl => &mut self.foto_url,
            Field::IgUsername => &mut self.ig_username,
            Field::LineUsername => &mut self.line_username,
            Field::DiscordUsername => &mut self.discord_username,
            Field::Question1 => &mut self.question_1,
            Field::Question2 => &mut self.question_2,
            Field::Question3 => &mut self.question_3,
            Field::Question4 => &mut self.question_4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.as_str()), Some(field));
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
        assert_eq!(Field::parse("step1_completed"), None);
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut base = ApplicantFields::default()
            .with(Field::Nama, "Ayu")
            .with(Field::Npm, "2306");
        let patch = ApplicantFields::default()
            .with(Field::Npm, "2307")
            .with(Field::CvUrl, "");

        base.merge(&patch);

        assert_eq!(base.get(Field::Nama), Some("Ayu"));
        assert_eq!(base.get(Field::Npm), Some("2307"));
        // A blank value is present and overwrites.
        assert_eq!(base.get(Field::CvUrl), Some(""));
        assert!(base.is_blank(Field::CvUrl));
    }

    #[test]
    fn test_present_fields_in_form_order() {
        let fields = ApplicantFields::default()
            .with(Field::Question4, "x")
            .with(Field::Email, "a@x.com");
        assert_eq!(fields.present_fields(), vec![Field::Email, Field::Question4]);
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let json = r#"{"nama":"A","question_2":"why","is_draft":true}"#;
        let fields: ApplicantFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.nama.as_deref(), Some("A"));
        assert_eq!(fields.question_2.as_deref(), Some("why"));
        assert!(fields.email.is_none());
    }
}
