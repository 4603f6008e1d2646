use std::sync::Arc;

use folio_core::{collections, DocId, Document, DocumentQuery, DocumentStore, Predicate};
use serde_json::json;

use crate::error::ArchiveError;
use crate::user::{normalize_email, User, UserDraft};

/// Bcrypt cost factor for stored password hashes.
const BCRYPT_COST: u32 = 10;

/// Account storage. Passwords are hashed on the way in and compared
/// one-way; the hash never leaves this layer except inside [`User`].
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a new account. The email is trimmed and lowercased before
    /// the uniqueness check; a taken email is a 400, mirroring the unique
    /// constraint in the store.
    pub fn register(&self, draft: UserDraft) -> Result<User, ArchiveError> {
        draft.validate()?;
        let email = normalize_email(draft.email.as_deref().unwrap_or_default());
        let name = draft.name.unwrap_or_default();

        if self.find_by_email(&email)?.is_some() {
            return Err(ArchiveError::DuplicateField(
                "a user with this email already exists".into(),
            ));
        }

        let hash = bcrypt::hash(draft.password.unwrap_or_default(), BCRYPT_COST)
            .map_err(|e| ArchiveError::Internal(format!("password hashing failed: {e}")))?;

        let doc = Document::new(collections::USERS, User::to_payload(&email, &name, &hash));
        self.store.insert(doc.clone())?;
        User::from_document(&doc)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, ArchiveError> {
        let query = DocumentQuery {
            predicates: vec![Predicate::Eq("email".into(), json!(normalize_email(email)))],
            limit: Some(1),
            ..Default::default()
        };
        let hits = self.store.query(collections::USERS, &query)?;
        match hits.first() {
            Some(hit) => Ok(Some(User::from_document(&hit.doc)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, id: DocId) -> Result<Option<User>, ArchiveError> {
        match self.store.get(collections::USERS, id)? {
            Some(doc) => Ok(Some(User::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// One-way password check. Always false for a hash that fails to
    /// parse; the hash itself is never exposed.
    pub fn verify_password(&self, user: &User, candidate: &str) -> bool {
        bcrypt::verify(candidate, &user.password_hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::SqliteStore;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    fn draft(name: &str, email: &str, password: &str) -> UserDraft {
        UserDraft {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn register_hashes_password_and_normalizes_email() {
        let repo = repo();
        let user = repo
            .register(draft("Ada", "  Ada@Example.COM ", "correct horse"))
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "correct horse");
        assert!(user.password_hash.starts_with("$2"));

        assert!(repo.verify_password(&user, "correct horse"));
        assert!(!repo.verify_password(&user, "wrong horse"));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let repo = repo();
        repo.register(draft("Ada", "ada@example.com", "secret1")).unwrap();
        let err = repo
            .register(draft("Imposter", "ADA@example.com", "secret2"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateField(_)));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn find_by_email_is_case_insensitive_via_normalization() {
        let repo = repo();
        let user = repo.register(draft("Ada", "ada@example.com", "secret1")).unwrap();
        let found = repo.find_by_email("ADA@EXAMPLE.COM").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn get_by_id_round_trips() {
        let repo = repo();
        let user = repo.register(draft("Ada", "ada@example.com", "secret1")).unwrap();
        let fetched = repo.get(user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(repo.get(uuid::Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn registration_validation_failures() {
        let repo = repo();
        assert!(repo.register(UserDraft::default()).is_err());
        assert!(repo.register(draft("Ada", "bad-email", "secret1")).is_err());
        assert!(repo.register(draft("Ada", "a@b.co", "tiny")).is_err());
    }
}
