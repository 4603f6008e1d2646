//! Consistency repair for the article/citation relationship.
//!
//! The create-then-append and delete-then-pull sequences are not wrapped in
//! a transaction, so a failure between the two writes can strand either
//! side of the link. This pass walks both collections and reconciles:
//! dangling ids are pulled, missing back-references are pushed, and
//! citations whose owner no longer exists are removed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::json;

use folio_core::{collections, DocId, DocumentQuery, DocumentStore, Patch};

use crate::article::Article;
use crate::citation::Citation;
use crate::error::ArchiveError;

/// What a reconcile pass found and fixed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    /// Ids pulled from article lists because no citation backs them.
    pub dangling_refs_removed: usize,
    /// Citation ids pushed onto owners that had lost them.
    pub back_refs_restored: usize,
    /// Citations deleted because their owning article is gone.
    pub orphans_removed: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == RepairReport::default()
    }
}

/// Scan every article and citation and repair the relationship in both
/// directions. Safe to run at any time; a clean pass is a no-op.
pub fn reconcile(store: &Arc<dyn DocumentStore>) -> Result<RepairReport, ArchiveError> {
    let everything = DocumentQuery::default();

    let articles = store
        .query(collections::ARTICLES, &everything)?
        .iter()
        .map(|h| Article::from_document(&h.doc))
        .collect::<Result<Vec<_>, _>>()?;
    let citations = store
        .query(collections::CITATIONS, &everything)?
        .iter()
        .map(|h| Citation::from_document(&h.doc))
        .collect::<Result<Vec<_>, _>>()?;

    let citation_ids: HashSet<DocId> = citations.iter().map(|c| c.id).collect();
    let article_lists: HashMap<DocId, &Article> =
        articles.iter().map(|a| (a.id, a)).collect();

    let mut report = RepairReport::default();

    // Direction one: article lists pointing at citations that do not exist.
    for article in &articles {
        for stale in article.citations.iter().filter(|id| !citation_ids.contains(*id)) {
            tracing::debug!(article_id = %article.id, citation_id = %stale, "removing dangling citation ref");
            store.update(
                collections::ARTICLES,
                article.id,
                vec![Patch::Pull("citations".into(), json!(stale.to_string()))],
            )?;
            report.dangling_refs_removed += 1;
        }
    }

    // Direction two: citations whose owner is missing them, or missing
    // entirely.
    for citation in &citations {
        match article_lists.get(&citation.article_id) {
            Some(owner) if owner.citations.contains(&citation.id) => {}
            Some(owner) => {
                tracing::debug!(article_id = %owner.id, citation_id = %citation.id, "restoring lost back-reference");
                store.update(
                    collections::ARTICLES,
                    owner.id,
                    vec![Patch::Push("citations".into(), json!(citation.id.to_string()))],
                )?;
                report.back_refs_restored += 1;
            }
            None => {
                tracing::debug!(citation_id = %citation.id, "removing orphaned citation");
                store.delete(collections::CITATIONS, citation.id)?;
                report.orphans_removed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleDraft;
    use crate::articles::ArticleRepository;
    use crate::citation::CitationDraft;
    use crate::citations::CitationRepository;
    use folio_core::SqliteStore;

    struct Fixture {
        store: Arc<dyn DocumentStore>,
        articles: Arc<ArticleRepository>,
        citations: CitationRepository,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let articles = Arc::new(ArticleRepository::new(store.clone()));
        let citations = CitationRepository::new(store.clone(), articles.clone());
        Fixture {
            store,
            articles,
            citations,
        }
    }

    fn seed(fx: &Fixture) -> (Article, Citation) {
        let article = fx
            .articles
            .create(ArticleDraft {
                title: Some("Host".into()),
                authors: Some(vec!["A".into()]),
                year: Some(2020),
                ..Default::default()
            })
            .unwrap();
        let citation = fx
            .citations
            .create(CitationDraft {
                article_id: Some(article.id.to_string()),
                reference_text: Some("A reference".into()),
                ..Default::default()
            })
            .unwrap();
        (article, citation)
    }

    #[test]
    fn clean_state_is_a_no_op() {
        let fx = fixture();
        seed(&fx);
        let report = reconcile(&fx.store).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn dangling_ref_is_pulled() {
        let fx = fixture();
        let (article, _) = seed(&fx);

        // Inject a reference to a citation that was never written.
        fx.store
            .update(
                collections::ARTICLES,
                article.id,
                vec![Patch::Push(
                    "citations".into(),
                    json!(uuid::Uuid::new_v4().to_string()),
                )],
            )
            .unwrap();

        let report = reconcile(&fx.store).unwrap();
        assert_eq!(report.dangling_refs_removed, 1);

        let repaired = fx.articles.get(&article.id.to_string()).unwrap();
        assert_eq!(repaired.citations.len(), 1);
        assert!(reconcile(&fx.store).unwrap().is_clean());
    }

    #[test]
    fn lost_back_ref_is_restored() {
        let fx = fixture();
        let (article, citation) = seed(&fx);

        // Simulate the failed-append window: the citation exists but the
        // owner's list lacks it.
        fx.store
            .update(
                collections::ARTICLES,
                article.id,
                vec![Patch::Pull("citations".into(), json!(citation.id.to_string()))],
            )
            .unwrap();

        let report = reconcile(&fx.store).unwrap();
        assert_eq!(report.back_refs_restored, 1);

        let repaired = fx.articles.get(&article.id.to_string()).unwrap();
        assert_eq!(repaired.citations, vec![citation.id]);
    }

    #[test]
    fn orphaned_citation_is_removed() {
        let fx = fixture();
        let (article, citation) = seed(&fx);

        // Deleting the article never cascades, so the citation is stranded.
        fx.articles.delete(&article.id.to_string()).unwrap();
        assert!(fx.citations.get(&citation.id.to_string()).is_ok());

        let report = reconcile(&fx.store).unwrap();
        assert_eq!(report.orphans_removed, 1);
        assert_eq!(
            fx.citations.get(&citation.id.to_string()).unwrap_err().status(),
            404
        );
    }
}
