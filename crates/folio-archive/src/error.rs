use folio_core::{DocId, StoreError};

use crate::validation::FieldError;

/// The closed error taxonomy of the archive layer.
///
/// Every variant carries its HTTP status; the server maps the set
/// exhaustively, so no status sniffing on stringly-typed errors happens
/// anywhere.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Schema or field-constraint violation (400).
    #[error("invalid input data")]
    Validation(Vec<FieldError>),

    /// Malformed identity (400).
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// Unique-constraint violation (400).
    #[error("{0}")]
    DuplicateField(String),

    /// A citation's required parent article does not exist. Reported as
    /// 400: the parent is an input, not the looked-up resource.
    #[error("parent article not found")]
    ParentNotFound,

    /// The requested resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Missing, invalid or expired credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Unclassified failure (500); the client only ever sees a generic
    /// message for this variant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    pub fn status(&self) -> u16 {
        match self {
            ArchiveError::Validation(_)
            | ArchiveError::InvalidId(_)
            | ArchiveError::DuplicateField(_)
            | ArchiveError::ParentNotFound => 400,
            ArchiveError::Unauthorized(_) => 401,
            ArchiveError::NotFound(_) => 404,
            ArchiveError::Internal(_) => 500,
        }
    }

    /// Whether the error is operational: anticipated, classified, and safe
    /// to report to the client verbatim.
    pub fn is_operational(&self) -> bool {
        !matches!(self, ArchiveError::Internal(_))
    }

    /// Field-level detail for validation failures, if any.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            ArchiveError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ArchiveError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for ArchiveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => {
                ArchiveError::NotFound(format!("no record found with id {id}"))
            }
            StoreError::Conflict(msg) => ArchiveError::DuplicateField(format!(
                "duplicate field value: {msg}. Please use another value"
            )),
            StoreError::InvalidQuery(msg) => ArchiveError::validation("query", msg),
            StoreError::AlreadyExists(id) => {
                ArchiveError::Internal(format!("id collision on insert: {id}"))
            }
            StoreError::Storage(msg) => ArchiveError::Internal(msg),
        }
    }
}

/// Parse a path/body identity, mapping malformed input to the 400-class
/// `InvalidId` error.
pub fn parse_id(raw: &str) -> Result<DocId, ArchiveError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ArchiveError::InvalidId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ArchiveError::validation("year", "out of range").status(), 400);
        assert_eq!(ArchiveError::InvalidId("nope".into()).status(), 400);
        assert_eq!(ArchiveError::ParentNotFound.status(), 400);
        assert_eq!(ArchiveError::NotFound("article not found".into()).status(), 404);
        assert_eq!(ArchiveError::Unauthorized("no token".into()).status(), 401);
        assert_eq!(ArchiveError::Internal("boom".into()).status(), 500);
    }

    #[test]
    fn internal_errors_are_not_operational() {
        assert!(!ArchiveError::Internal("boom".into()).is_operational());
        assert!(ArchiveError::ParentNotFound.is_operational());
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_err());
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn store_conflict_becomes_duplicate_field() {
        let err: ArchiveError = StoreError::Conflict("idx_users_email".into()).into();
        assert!(matches!(err, ArchiveError::DuplicateField(_)));
        assert_eq!(err.status(), 400);
    }
}
