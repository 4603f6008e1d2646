use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use folio_core::{DocId, Document};

use crate::error::ArchiveError;
use crate::validation::FieldError;

pub const PASSWORD_MIN: usize = 6;

lazy_static! {
    /// Basic email shape: something@something.something
    static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// A registered user. The password exists only as a bcrypt hash and the
/// struct never serializes it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: DocId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The client-facing view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: DocId,
    pub name: String,
    pub email: String,
}

/// Registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Trim and lowercase an email before storage or lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl UserDraft {
    pub fn validate(&self) -> Result<(), ArchiveError> {
        let mut errors = Vec::new();
        match &self.name {
            None => errors.push(FieldError::new("name", "the name is required")),
            Some(n) if n.trim().is_empty() => {
                errors.push(FieldError::new("name", "the name cannot be empty"))
            }
            Some(_) => {}
        }
        match &self.email {
            None => errors.push(FieldError::new("email", "the email is required")),
            Some(e) if !EMAIL_RE.is_match(&normalize_email(e)) => {
                errors.push(FieldError::new("email", "the email is not valid"))
            }
            Some(_) => {}
        }
        match &self.password {
            None => errors.push(FieldError::new("password", "the password is required")),
            Some(p) if p.chars().count() < PASSWORD_MIN => errors.push(FieldError::new(
                "password",
                format!("the password must contain at least {PASSWORD_MIN} characters"),
            )),
            Some(_) => {}
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Validation(errors))
        }
    }
}

impl User {
    pub fn from_document(doc: &Document) -> Result<Self, ArchiveError> {
        let payload = doc
            .payload
            .as_object()
            .ok_or_else(|| corrupt(doc.id, "payload is not an object"))?;
        Ok(User {
            id: doc.id,
            email: required_str(payload, "email", doc.id)?,
            name: required_str(payload, "name", doc.id)?,
            password_hash: required_str(payload, "password", doc.id)?,
            created_at: doc.created,
        })
    }

    pub fn to_payload(email: &str, name: &str, password_hash: &str) -> Value {
        let mut payload = Map::new();
        payload.insert("email".into(), json!(email));
        payload.insert("name".into(), json!(name.trim()));
        payload.insert("password".into(), json!(password_hash));
        Value::Object(payload)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

fn required_str(
    payload: &Map<String, Value>,
    field: &str,
    id: DocId,
) -> Result<String, ArchiveError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| corrupt(id, field))
}

fn corrupt(id: DocId, what: &str) -> ArchiveError {
    ArchiveError::Internal(format!("corrupt user document {id}: missing {what}"))
}
