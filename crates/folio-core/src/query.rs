use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A query against one collection of the document store.
///
/// When a `FullText` predicate is present and `sort` is empty, results are
/// ordered by descending relevance score; `with_score` additionally asks
/// the store to return the score on each hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub with_score: bool,
}

/// Filter predicate for document queries.
///
/// `Eq` on an array-valued field matches when any element equals the
/// operand, mirroring document-database equality semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    FullText(String),
}

/// Sort descriptor for query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field name: `createdAt`, `id`, or a payload field such as `year`.
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

impl DocumentQuery {
    /// Whether any predicate is a full-text search.
    pub fn has_full_text(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, Predicate::FullText(_)))
    }
}
