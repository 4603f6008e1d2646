use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{DocId, Document, Hit};
use crate::query::DocumentQuery;

/// Mutation to apply to a document's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Patch {
    /// Set (or replace) a field.
    Set(String, Value),
    /// Remove a field.
    Unset(String),
    /// Append a value to an array field, creating the array if absent.
    Push(String, Value),
    /// Remove every element equal to the value from an array field.
    Pull(String, Value),
}

/// The trait all storage backends implement.
///
/// A store handle is constructed explicitly and passed into each repository;
/// it is opened at process start and dropped at shutdown. Writes to a single
/// document are atomic; sequences spanning documents are not.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Returns the document's id.
    fn insert(&self, doc: Document) -> Result<DocId, StoreError>;

    /// Insert multiple documents atomically.
    fn insert_batch(&self, docs: Vec<Document>) -> Result<Vec<DocId>, StoreError>;

    /// Get a document by id within a collection.
    fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError>;

    /// Batch-fetch documents by id, preserving the order of `ids`.
    /// Ids with no backing document are silently skipped.
    fn find_in(&self, collection: &str, ids: &[DocId]) -> Result<Vec<Document>, StoreError>;

    /// Apply patches to an existing document and bump its revision.
    /// Returns the updated document.
    fn update(
        &self,
        collection: &str,
        id: DocId,
        patches: Vec<Patch>,
    ) -> Result<Document, StoreError>;

    /// Delete a document by id.
    fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError>;

    /// Query documents matching predicates, sorted and paginated.
    fn query(&self, collection: &str, q: &DocumentQuery) -> Result<Vec<Hit>, StoreError>;

    /// Count documents matching a query without fetching them.
    fn count(&self, collection: &str, q: &DocumentQuery) -> Result<usize, StoreError>;
}

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocId),

    #[error("document already exists: {0}")]
    AlreadyExists(DocId),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_serde_round_trip() {
        let patches = vec![
            Patch::Set("title".into(), json!("New Title")),
            Patch::Unset("abstract".into()),
            Patch::Push("citations".into(), json!("b9c1e6a2")),
            Patch::Pull("citations".into(), json!("b9c1e6a2")),
        ];
        for p in &patches {
            let encoded = serde_json::to_string(p).unwrap();
            let back: Patch = serde_json::from_str(&encoded).unwrap();
            assert_eq!(*p, back);
        }
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::NotFound(uuid::Uuid::nil());
        assert!(err.to_string().contains("not found"));

        let err = StoreError::InvalidQuery("bad field name: a-b".into());
        assert!(err.to_string().contains("a-b"));
    }
}
