//! Document store seam.
//!
//! The service never talks to a database directly: profiles and lookup
//! records live in a hosted document database (Appwrite) reached through
//! [`DocumentStore`]. [`memory::MemoryStore`] is the in-process stand-in used
//! for local runs and tests.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod query;

pub use query::Query;

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("document store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("document store unreachable: {0}")]
    Transport(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// A stored document: system id plus user fields.
///
/// System attributes other than `$id` (`$createdAt`, `$collectionId`, ...)
/// stay in `fields` and are ignored by typed conversions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut fields = self.fields;
        fields.insert("$id".into(), Value::String(self.id));
        serde_json::from_value(Value::Object(fields)).map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

/// Attribute type together with its default, if the attribute has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String { size: u32 },
    Integer { default: Option<i64> },
    Boolean { default: Option<bool> },
}

impl AttributeKind {
    pub fn default_value(&self) -> Option<Value> {
        match *self {
            AttributeKind::String { .. } => None,
            AttributeKind::Integer { default } => default.map(Value::from),
            AttributeKind::Boolean { default } => default.map(Value::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub key: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub key: &'static str,
    pub attributes: &'static [&'static str],
}

/// Operations the service needs from the hosted document database.
///
/// Every implementation is bound to a single database id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn database_id(&self) -> &str;

    async fn get_database(&self) -> Result<(), StoreError>;
    async fn create_database(&self, name: &str) -> Result<(), StoreError>;

    async fn get_collection(&self, collection: &str) -> Result<(), StoreError>;
    async fn create_collection(&self, collection: &str, name: &str) -> Result<(), StoreError>;
    async fn create_attribute(&self, collection: &str, attribute: &AttributeSpec) -> Result<(), StoreError>;
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError>;

    async fn create_document(&self, collection: &str, id: &str, data: Fields) -> Result<Document, StoreError>;
    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, StoreError>;
    /// Partial update: only the keys present in `data` are overwritten.
    async fn update_document(&self, collection: &str, id: &str, data: Fields) -> Result<Document, StoreError>;
    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<Vec<Document>, StoreError>;
}

/// Fresh document id in the hosted store's accepted alphabet.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(rename = "$id")]
        id: String,
        name: String,
    }

    #[test]
    fn document_parses_system_id_and_keeps_fields() {
        let doc: Document = serde_json::from_value(json!({
            "$id": "abc",
            "$createdAt": "2024-01-01T00:00:00.000+00:00",
            "name": "Asha",
        }))
        .unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.fields["name"], "Asha");

        let typed: Sample = doc.into_typed().unwrap();
        assert_eq!(typed.id, "abc");
        assert_eq!(typed.name, "Asha");
    }

    #[test]
    fn into_typed_reports_missing_fields() {
        let doc = Document {
            id: "abc".into(),
            fields: Fields::new(),
        };
        let err = doc.into_typed::<Sample>().unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn unique_ids_are_32_hex_chars() {
        let id = unique_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, unique_id());
    }
}
