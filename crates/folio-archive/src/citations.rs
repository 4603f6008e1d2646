use std::sync::Arc;

use folio_core::{collections, Document, DocumentQuery, DocumentStore, Patch, Predicate, SortKey, StoreError};
use serde_json::json;

use crate::articles::ArticleRepository;
use crate::citation::{Citation, CitationDraft, CitationPatch};
use crate::error::{parse_id, ArchiveError};

/// Persistence of citations plus the two-way bookkeeping that keeps the
/// owning article's `citations` list consistent.
pub struct CitationRepository {
    store: Arc<dyn DocumentStore>,
    articles: Arc<ArticleRepository>,
}

impl CitationRepository {
    pub fn new(store: Arc<dyn DocumentStore>, articles: Arc<ArticleRepository>) -> Self {
        Self { store, articles }
    }

    /// Create a citation under an existing article.
    ///
    /// The parent is a required input, not a looked-up resource: a missing,
    /// malformed or nonexistent `articleId` is a 400, never a 404. On
    /// success the new citation's id is appended to the owner's list.
    /// Insert and append are two separate writes with no transaction
    /// between them, so a failure after the insert leaves a citation whose
    /// owner does not list it (the repair pass reconciles such windows).
    pub fn create(&self, draft: CitationDraft) -> Result<Citation, ArchiveError> {
        let article_id = match &draft.article_id {
            Some(raw) => parse_id(raw)
                .map_err(|_| ArchiveError::validation("articleId", "articleId is missing or not a valid id"))?,
            None => {
                return Err(ArchiveError::validation(
                    "articleId",
                    "articleId is missing or not a valid id",
                ))
            }
        };
        if !self.articles.exists(article_id)? {
            return Err(ArchiveError::ParentNotFound);
        }
        draft.validate()?;

        let doc = Document::new(collections::CITATIONS, draft.into_payload(article_id));
        self.store.insert(doc.clone())?;
        let citation = Citation::from_document(&doc)?;

        self.store.update(
            collections::ARTICLES,
            article_id,
            vec![Patch::Push("citations".into(), json!(citation.id.to_string()))],
        )?;

        Ok(citation)
    }

    /// List citations, optionally restricted to one article, newest first.
    pub fn list(&self, article_id: Option<&str>) -> Result<Vec<Citation>, ArchiveError> {
        let mut predicates = Vec::new();
        if let Some(raw) = article_id {
            let id = parse_id(raw)?;
            predicates.push(Predicate::Eq("articleId".into(), json!(id.to_string())));
        }
        let query = DocumentQuery {
            predicates,
            sort: vec![SortKey::desc("createdAt")],
            ..Default::default()
        };
        let hits = self.store.query(collections::CITATIONS, &query)?;
        hits.iter().map(|h| Citation::from_document(&h.doc)).collect()
    }

    pub fn get(&self, raw_id: &str) -> Result<Citation, ArchiveError> {
        let id = parse_id(raw_id)?;
        let doc = self
            .store
            .get(collections::CITATIONS, id)?
            .ok_or_else(not_found)?;
        Citation::from_document(&doc)
    }

    /// Partial update; the reference-text bound is re-checked when present.
    pub fn update(&self, raw_id: &str, patch: CitationPatch) -> Result<Citation, ArchiveError> {
        let id = parse_id(raw_id)?;
        patch.validate()?;

        let mut patches = Vec::new();
        if let Some(text) = patch.reference_text {
            patches.push(Patch::Set("referenceText".into(), json!(text)));
        }
        if let Some(cited) = patch.cited_article_id {
            patches.push(Patch::Set("citedArticleId".into(), json!(cited)));
        }
        if let Some(pages) = patch.pages_cited {
            patches.push(Patch::Set("pagesCited".into(), json!(pages)));
        }

        let doc = self
            .store
            .update(collections::CITATIONS, id, patches)
            .map_err(map_not_found)?;
        Citation::from_document(&doc)
    }

    /// Delete a citation, then pull its id out of the owning article's
    /// list. A vanished owner is logged and swallowed; the delete itself
    /// already succeeded from the caller's point of view.
    pub fn delete(&self, raw_id: &str) -> Result<(), ArchiveError> {
        let citation = self.get(raw_id)?;
        self.store
            .delete(collections::CITATIONS, citation.id)
            .map_err(map_not_found)?;

        match self.store.update(
            collections::ARTICLES,
            citation.article_id,
            vec![Patch::Pull("citations".into(), json!(citation.id.to_string()))],
        ) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(
                    article_id = %citation.article_id,
                    citation_id = %citation.id,
                    "owning article not found while cleaning up after citation delete"
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

fn not_found() -> ArchiveError {
    ArchiveError::NotFound("no citation found with the given id".into())
}

fn map_not_found(e: StoreError) -> ArchiveError {
    match e {
        StoreError::NotFound(_) => not_found(),
        other => other.into(),
    }
}
