use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use folio_core::{DocId, Document};

use crate::error::ArchiveError;
use crate::validation::FieldError;

/// Bounds on the free-text reference of a citation.
pub const REFERENCE_TEXT_MIN: usize = 5;
pub const REFERENCE_TEXT_MAX: usize = 1000;
pub const PAGES_CITED_MAX: usize = 100;

/// A reference entry owned by exactly one article, optionally pointing at
/// another article in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: DocId,
    pub article_id: DocId,
    pub reference_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_article_id: Option<DocId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_cited: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Incoming citation payload for creation. Ids arrive as raw strings so
/// that malformed input maps to the 400-class id error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationDraft {
    pub article_id: Option<String>,
    pub reference_text: Option<String>,
    pub cited_article_id: Option<String>,
    pub pages_cited: Option<String>,
}

/// Partial update for a citation. Re-parenting is not supported: an
/// `articleId` in the body is ignored, so ownership set at creation is
/// final.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationPatch {
    pub reference_text: Option<String>,
    pub cited_article_id: Option<String>,
    pub pages_cited: Option<String>,
}

fn check_reference_text(text: &str, errors: &mut Vec<FieldError>) {
    let len = text.chars().count();
    if len < REFERENCE_TEXT_MIN {
        errors.push(FieldError::new(
            "referenceText",
            format!("the reference text must contain at least {REFERENCE_TEXT_MIN} characters"),
        ));
    } else if len > REFERENCE_TEXT_MAX {
        errors.push(FieldError::new(
            "referenceText",
            format!("the reference text cannot exceed {REFERENCE_TEXT_MAX} characters"),
        ));
    }
}

fn check_pages_cited(pages: &str, errors: &mut Vec<FieldError>) {
    if pages.chars().count() > PAGES_CITED_MAX {
        errors.push(FieldError::new(
            "pagesCited",
            format!("pagesCited cannot exceed {PAGES_CITED_MAX} characters"),
        ));
    }
}

fn check_cited_article_id(raw: &str, errors: &mut Vec<FieldError>) {
    // Existence is deliberately never checked; only the shape is.
    if uuid::Uuid::parse_str(raw).is_err() {
        errors.push(FieldError::new("citedArticleId", "not a valid id"));
    }
}

impl CitationDraft {
    /// Validate everything except the parent id, which the repository
    /// resolves separately (missing or malformed parent is its own error).
    pub fn validate(&self) -> Result<(), ArchiveError> {
        let mut errors = Vec::new();
        match &self.reference_text {
            None => errors.push(FieldError::new(
                "referenceText",
                "the reference text is required",
            )),
            Some(t) => check_reference_text(t, &mut errors),
        }
        if let Some(p) = &self.pages_cited {
            check_pages_cited(p, &mut errors);
        }
        if let Some(raw) = &self.cited_article_id {
            check_cited_article_id(raw, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Validation(errors))
        }
    }

    /// Build the stored payload. Caller has already validated the draft and
    /// resolved the parent id.
    pub fn into_payload(self, article_id: DocId) -> Value {
        let mut payload = Map::new();
        payload.insert("articleId".into(), json!(article_id.to_string()));
        payload.insert(
            "referenceText".into(),
            json!(self.reference_text.unwrap_or_default()),
        );
        if let Some(raw) = self.cited_article_id {
            payload.insert("citedArticleId".into(), json!(raw));
        }
        if let Some(p) = self.pages_cited {
            payload.insert("pagesCited".into(), json!(p));
        }
        Value::Object(payload)
    }
}

impl CitationPatch {
    pub fn validate(&self) -> Result<(), ArchiveError> {
        let mut errors = Vec::new();
        if let Some(t) = &self.reference_text {
            check_reference_text(t, &mut errors);
        }
        if let Some(p) = &self.pages_cited {
            check_pages_cited(p, &mut errors);
        }
        if let Some(raw) = &self.cited_article_id {
            check_cited_article_id(raw, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Validation(errors))
        }
    }
}

impl Citation {
    pub fn from_document(doc: &Document) -> Result<Self, ArchiveError> {
        let payload = doc
            .payload
            .as_object()
            .ok_or_else(|| corrupt(doc.id, "payload is not an object"))?;

        let article_id = payload
            .get("articleId")
            .and_then(Value::as_str)
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .ok_or_else(|| corrupt(doc.id, "missing or malformed articleId"))?;
        let reference_text = payload
            .get("referenceText")
            .and_then(Value::as_str)
            .ok_or_else(|| corrupt(doc.id, "missing referenceText"))?
            .to_string();
        let cited_article_id = payload
            .get("citedArticleId")
            .and_then(Value::as_str)
            .and_then(|s| uuid::Uuid::parse_str(s).ok());
        let pages_cited = payload
            .get("pagesCited")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(Citation {
            id: doc.id,
            article_id,
            reference_text,
            cited_article_id,
            pages_cited,
            created_at: doc.created,
        })
    }
}

fn corrupt(id: DocId, what: &str) -> ArchiveError {
    ArchiveError::Internal(format!("corrupt citation document {id}: {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::collections;

    #[test]
    fn reference_text_bounds() {
        let short = CitationDraft {
            reference_text: Some("abcd".into()), // 4 chars, below minimum
            ..Default::default()
        };
        assert!(short.validate().is_err());

        let long = CitationDraft {
            reference_text: Some("x".repeat(REFERENCE_TEXT_MAX + 1)),
            ..Default::default()
        };
        assert!(long.validate().is_err());

        let ok = CitationDraft {
            reference_text: Some("Smith et al. (2020)".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn missing_reference_text_fails() {
        let err = CitationDraft::default().validate().unwrap_err();
        assert!(err
            .field_errors()
            .unwrap()
            .iter()
            .any(|e| e.field == "referenceText"));
    }

    #[test]
    fn pages_cited_bound() {
        let draft = CitationDraft {
            reference_text: Some("Valid reference".into()),
            pages_cited: Some("p".repeat(PAGES_CITED_MAX + 1)),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn cited_article_id_shape_is_checked_but_not_existence() {
        let bad = CitationDraft {
            reference_text: Some("Valid reference".into()),
            cited_article_id: Some("garbage".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        // A well-formed id passes validation without any lookup.
        let ok = CitationDraft {
            reference_text: Some("Valid reference".into()),
            cited_article_id: Some(uuid::Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn payload_round_trips_through_document() {
        let owner = uuid::Uuid::new_v4();
        let draft = CitationDraft {
            article_id: Some(owner.to_string()),
            reference_text: Some("Jones, Deep Fields, 2021".into()),
            pages_cited: Some("12-19".into()),
            ..Default::default()
        };
        let doc = Document::new(collections::CITATIONS, draft.into_payload(owner));
        let citation = Citation::from_document(&doc).unwrap();
        assert_eq!(citation.article_id, owner);
        assert_eq!(citation.reference_text, "Jones, Deep Fields, 2021");
        assert_eq!(citation.pages_cited.as_deref(), Some("12-19"));
        assert_eq!(citation.cited_article_id, None);
    }
}
