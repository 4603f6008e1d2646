use std::sync::Arc;

use folio_core::{collections, DocId, Document, DocumentStore, Patch};
use serde_json::json;

use crate::article::{Article, ArticleDraft, ArticleHit, ArticleWithCitations};
use crate::citation::Citation;
use crate::error::{parse_id, ArchiveError};
use crate::query_builder::build_list_query;

/// Persistence and retrieval of articles. Authorization decisions belong
/// to the HTTP layer; this type only enforces data constraints.
pub struct ArticleRepository {
    store: Arc<dyn DocumentStore>,
}

impl ArticleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert one article after checking the creation constraints.
    pub fn create(&self, draft: ArticleDraft) -> Result<Article, ArchiveError> {
        draft.validate_create()?;
        let doc = Document::new(collections::ARTICLES, draft.into_payload());
        self.store.insert(doc.clone())?;
        Article::from_document(&doc)
    }

    /// Insert several articles in one operation. Every draft is validated
    /// up front and the batch inserts atomically.
    pub fn create_many(&self, drafts: Vec<ArticleDraft>) -> Result<Vec<Article>, ArchiveError> {
        for draft in &drafts {
            draft.validate_create()?;
        }
        let docs: Vec<Document> = drafts
            .into_iter()
            .map(|d| Document::new(collections::ARTICLES, d.into_payload()))
            .collect();
        self.store.insert_batch(docs.clone())?;
        docs.iter().map(Article::from_document).collect()
    }

    /// Execute a list request. Each call re-runs the query; the returned
    /// sequence is a snapshot, not a resumable cursor.
    pub fn list(&self, params: &[(String, String)]) -> Result<Vec<ArticleHit>, ArchiveError> {
        let query = build_list_query(params)?;
        let hits = self.store.query(collections::ARTICLES, &query)?;
        hits.into_iter()
            .map(|hit| {
                Ok(ArticleHit {
                    article: Article::from_document(&hit.doc)?,
                    score: hit.score,
                })
            })
            .collect()
    }

    pub fn get(&self, raw_id: &str) -> Result<Article, ArchiveError> {
        let id = parse_id(raw_id)?;
        let doc = self
            .store
            .get(collections::ARTICLES, id)?
            .ok_or_else(|| not_found())?;
        Article::from_document(&doc)
    }

    /// Fetch an article with its owned citations joined inline. Citation
    /// ids with no backing record are skipped; an empty list is valid.
    pub fn get_with_citations(&self, raw_id: &str) -> Result<ArticleWithCitations, ArchiveError> {
        let article = self.get(raw_id)?;
        let docs = self.store.find_in(collections::CITATIONS, &article.citations)?;
        let citations_data = docs
            .iter()
            .map(Citation::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArticleWithCitations {
            article,
            citations_data,
        })
    }

    /// Apply a partial update, re-running the field constraints for every
    /// field present. `createdAt` and the citation list are not touchable
    /// through this path.
    pub fn update(&self, raw_id: &str, patch: ArticleDraft) -> Result<Article, ArchiveError> {
        let id = parse_id(raw_id)?;
        patch.validate_update()?;

        let mut patches = Vec::new();
        if let Some(title) = patch.title {
            patches.push(Patch::Set("title".into(), json!(title.trim())));
        }
        if let Some(authors) = patch.authors {
            patches.push(Patch::Set("authors".into(), json!(authors)));
        }
        if let Some(year) = patch.year {
            patches.push(Patch::Set("year".into(), json!(year)));
        }
        if let Some(journal) = patch.journal {
            patches.push(Patch::Set("journal".into(), json!(journal.trim())));
        }
        if let Some(volume) = patch.volume {
            patches.push(Patch::Set("volume".into(), json!(volume)));
        }
        if let Some(issue) = patch.issue {
            patches.push(Patch::Set("issue".into(), json!(issue)));
        }
        if let Some(pages) = patch.pages {
            patches.push(Patch::Set("pages".into(), json!(pages)));
        }
        if let Some(abstract_text) = patch.abstract_text {
            patches.push(Patch::Set("abstract".into(), json!(abstract_text)));
        }

        let doc = self
            .store
            .update(collections::ARTICLES, id, patches)
            .map_err(map_not_found)?;
        Article::from_document(&doc)
    }

    /// Delete an article. Owned citations are NOT cascaded; they become
    /// orphans until a repair pass removes them.
    pub fn delete(&self, raw_id: &str) -> Result<(), ArchiveError> {
        let id = parse_id(raw_id)?;
        self.store
            .delete(collections::ARTICLES, id)
            .map_err(map_not_found)
    }

    /// Existence probe used by the citation repository's parent check.
    pub fn exists(&self, id: DocId) -> Result<bool, ArchiveError> {
        Ok(self.store.get(collections::ARTICLES, id)?.is_some())
    }
}

fn not_found() -> ArchiveError {
    ArchiveError::NotFound("no article found with the given id".into())
}

fn map_not_found(e: folio_core::StoreError) -> ArchiveError {
    match e {
        folio_core::StoreError::NotFound(_) => not_found(),
        other => other.into(),
    }
}
