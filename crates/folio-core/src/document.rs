use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Globally unique document identifier (UUID v4).
pub type DocId = Uuid;

/// Collection names used by the folio suite.
pub mod collections {
    pub const ARTICLES: &str = "articles";
    pub const CITATIONS: &str = "citations";
    pub const USERS: &str = "users";
}

/// A persisted JSON document.
///
/// Domain-specific fields live in `payload`; universal metadata lives on
/// the struct directly. `rev` is an internal revision counter bumped by the
/// store on every update and never exposed through the API surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub collection: String,
    pub payload: Value,
    pub created: DateTime<Utc>,
    pub rev: i64,
}

impl Document {
    /// Build a fresh document with a new id and a zeroed revision.
    pub fn new(collection: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection: collection.into(),
            payload,
            created: Utc::now(),
            rev: 0,
        }
    }

    /// Read a string field out of the payload.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// A single query result: the document plus its relevance score when the
/// query carried a full-text predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub doc: Document,
    pub score: Option<f64>,
}
