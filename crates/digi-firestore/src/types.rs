//! Firestore REST wire types, limited to the value kinds applicant
//! documents use.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed Firestore field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// Integers travel as decimal strings
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339
    TimestampValue(String),
    StringValue(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `projects/{p}/databases/{d}/documents/{collection}/{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            fields: Some(fields),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>, fields: HashMap<String, Value>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(fields)
        }
    }

    /// Read a field as `T`; absent or differently typed fields are `None`.
    pub fn get<T: FromFirestoreValue>(&self, key: &str) -> Option<T> {
        self.fields
            .as_ref()
            .and_then(|f| f.get(key))
            .and_then(T::from_firestore_value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Precondition {
    pub exists: bool,
}

/// One write in an atomic commit: either an upsert or a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// Insert `document`; the commit fails if it already exists.
    pub fn create(document: Document) -> Self {
        Self {
            update: Some(document),
            delete: None,
            current_document: Some(Precondition { exists: false }),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            update: None,
            delete: Some(name.into()),
            current_document: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub commit_time: Option<String>,
}

pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        self.as_str().to_firestore_value()
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        self.as_ref()
            .map_or(Value::NullValue(()), ToFirestoreValue::to_firestore_value)
    }
}

pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            // Older form versions stored the cohort year as a number.
            Value::IntegerValue(n) => Some(n.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_wire_format() {
        let v = "Ayu".to_firestore_value();
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"stringValue": "Ayu"}));
        assert_eq!(
            serde_json::to_value(None::<String>.to_firestore_value()).unwrap(),
            json!({"nullValue": null})
        );
    }

    #[test]
    fn test_document_get_typed() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/form_drafts/a@x.com",
            "fields": {
                "nama": {"stringValue": "Ayu"},
                "angkatan": {"integerValue": "2021"},
                "step1_completed": {"booleanValue": true},
                "last_updated": {"timestampValue": "2024-05-01T10:00:00Z"}
            },
            "createTime": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.get::<String>("nama").as_deref(), Some("Ayu"));
        assert_eq!(doc.get::<String>("angkatan").as_deref(), Some("2021"));
        assert_eq!(doc.get::<bool>("step1_completed"), Some(true));
        assert!(doc.get::<DateTime<Utc>>("last_updated").is_some());
        assert_eq!(doc.get::<bool>("nama"), None);
    }

    #[test]
    fn test_create_write_carries_precondition() {
        let write = Write::create(Document::named("projects/p/x", HashMap::new()));
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["currentDocument"]["exists"], false);
        assert!(json.get("delete").is_none());
    }
}
