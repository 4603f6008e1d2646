use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use folio_core::{DocId, Document};

use crate::citation::Citation;
use crate::error::ArchiveError;
use crate::validation::FieldError;

/// Earliest publication year accepted for an article.
pub const MIN_YEAR: i64 = 1800;

/// An academic article with bibliographic metadata and the ids of the
/// citations it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: DocId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub citations: Vec<DocId>,
    pub created_at: DateTime<Utc>,
}

/// Incoming article payload; every field optional so that validation can
/// report all violations at once and the same shape serves partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub year: Option<i64>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

/// A list result: the article plus its relevance score when the listing
/// used a full-text query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleHit {
    #[serde(flatten)]
    pub article: Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// An article with its owned citations joined inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleWithCitations {
    #[serde(flatten)]
    pub article: Article,
    #[serde(rename = "citationsData")]
    pub citations_data: Vec<Citation>,
}

impl ArticleDraft {
    /// Check the constraints required at creation: title, at least one
    /// author, and a plausible year.
    pub fn validate_create(&self) -> Result<(), ArchiveError> {
        let mut errors = Vec::new();
        match &self.title {
            None => errors.push(FieldError::new("title", "the title is required")),
            Some(t) => Self::check_title(t, &mut errors),
        }
        match &self.authors {
            None => errors.push(FieldError::new("authors", "at least one author is required")),
            Some(a) => Self::check_authors(a, &mut errors),
        }
        match self.year {
            None => errors.push(FieldError::new("year", "the publication year is required")),
            Some(y) => Self::check_year(y, &mut errors),
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Validation(errors))
        }
    }

    /// Re-run the creation constraints, but only for fields present in a
    /// partial update.
    pub fn validate_update(&self) -> Result<(), ArchiveError> {
        let mut errors = Vec::new();
        if let Some(t) = &self.title {
            Self::check_title(t, &mut errors);
        }
        if let Some(a) = &self.authors {
            Self::check_authors(a, &mut errors);
        }
        if let Some(y) = self.year {
            Self::check_year(y, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::Validation(errors))
        }
    }

    fn check_title(title: &str, errors: &mut Vec<FieldError>) {
        if title.trim().is_empty() {
            errors.push(FieldError::new("title", "the title cannot be empty"));
        }
    }

    fn check_authors(authors: &[String], errors: &mut Vec<FieldError>) {
        if authors.is_empty() {
            errors.push(FieldError::new("authors", "at least one author is required"));
        } else if authors.iter().any(|a| a.trim().is_empty()) {
            errors.push(FieldError::new("authors", "author names cannot be empty"));
        }
    }

    fn check_year(year: i64, errors: &mut Vec<FieldError>) {
        let current = Utc::now().year() as i64;
        if year < MIN_YEAR || year > current {
            errors.push(FieldError::new(
                "year",
                format!("year must be between {MIN_YEAR} and {current}"),
            ));
        }
    }

    /// Build the stored payload for a validated creation draft. The
    /// `citations` list always starts empty; it is owned by the article
    /// and mutated only by the citation repository.
    pub fn into_payload(self) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "title".into(),
            json!(self.title.as_deref().unwrap_or_default().trim()),
        );
        payload.insert("authors".into(), json!(self.authors.unwrap_or_default()));
        payload.insert("year".into(), json!(self.year.unwrap_or_default()));
        if let Some(v) = self.journal {
            payload.insert("journal".into(), json!(v.trim()));
        }
        if let Some(v) = self.volume {
            payload.insert("volume".into(), json!(v));
        }
        if let Some(v) = self.issue {
            payload.insert("issue".into(), json!(v));
        }
        if let Some(v) = self.pages {
            payload.insert("pages".into(), json!(v));
        }
        if let Some(v) = self.abstract_text {
            payload.insert("abstract".into(), json!(v));
        }
        payload.insert("citations".into(), json!([]));
        Value::Object(payload)
    }
}

impl Article {
    /// Rebuild the domain view from a stored document. The store's internal
    /// revision counter is deliberately left behind here.
    pub fn from_document(doc: &Document) -> Result<Self, ArchiveError> {
        let payload = doc
            .payload
            .as_object()
            .ok_or_else(|| corrupt(doc.id, "payload is not an object"))?;

        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| corrupt(doc.id, "missing title"))?
            .to_string();
        let authors = payload
            .get("authors")
            .and_then(Value::as_array)
            .ok_or_else(|| corrupt(doc.id, "missing authors"))?
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect();
        let year = payload
            .get("year")
            .and_then(Value::as_i64)
            .ok_or_else(|| corrupt(doc.id, "missing year"))?;

        let mut citations = Vec::new();
        if let Some(list) = payload.get("citations").and_then(Value::as_array) {
            for entry in list {
                let raw = entry
                    .as_str()
                    .ok_or_else(|| corrupt(doc.id, "non-string citation id"))?;
                let id = uuid::Uuid::parse_str(raw)
                    .map_err(|_| corrupt(doc.id, "malformed citation id"))?;
                citations.push(id);
            }
        }

        Ok(Article {
            id: doc.id,
            title,
            authors,
            year,
            journal: opt_str(payload, "journal"),
            volume: opt_str(payload, "volume"),
            issue: opt_str(payload, "issue"),
            pages: opt_str(payload, "pages"),
            abstract_text: opt_str(payload, "abstract"),
            citations,
            created_at: doc.created,
        })
    }
}

fn opt_str(payload: &Map<String, Value>, field: &str) -> Option<String> {
    payload.get(field).and_then(Value::as_str).map(String::from)
}

fn corrupt(id: DocId, what: &str) -> ArchiveError {
    ArchiveError::Internal(format!("corrupt article document {id}: {what}"))
}
