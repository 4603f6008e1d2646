use std::path::Path;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::document::{collections, DocId, Document, Hit};
use crate::query::DocumentQuery;
use crate::sql::{compile_query, value_to_sql};
use crate::store::{DocumentStore, Patch, StoreError};

/// Relevance expression: negated bm25 so that higher means more relevant.
/// Column weights follow the article text index: title 5, abstract 1,
/// authors 1 (the unindexed doc_id column gets weight 0).
const SCORE_EXPR: &str = "-bm25(docs_fts, 0.0, 5.0, 1.0, 1.0) AS score";

const DOC_COLUMNS: &str =
    "documents.id, documents.collection, documents.payload, documents.created, documents.rev";

/// SQLite-backed implementation of the DocumentStore trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Storage(format!("open: {e}")))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("open_in_memory: {e}")))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                payload TEXT NOT NULL,
                created INTEGER NOT NULL,
                rev INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
            CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
                ON documents(json_extract(payload, '$.email'))
                WHERE collection = 'users';
            ",
        )
        .map_err(|e| StoreError::Storage(format!("init_schema: {e}")))?;

        // FTS5 table for article search. Standalone (not external content);
        // inserts and deletes are managed alongside the documents table.
        conn.execute_batch(
            "
            CREATE VIRTUAL TABLE IF NOT EXISTS docs_fts USING fts5(
                doc_id UNINDEXED,
                title, abstract, authors
            );
            ",
        )
        .map_err(|e| StoreError::Storage(format!("init_fts: {e}")))?;

        Ok(())
    }

    fn insert_doc(conn: &Connection, doc: &Document) -> Result<(), StoreError> {
        let payload_json =
            serde_json::to_string(&doc.payload).map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO documents (id, collection, payload, created, rev)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doc.id.to_string(),
                doc.collection,
                payload_json,
                doc.created.timestamp_millis(),
                doc.rev,
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, ref msg) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    if msg.as_deref().is_some_and(|m| m.contains("documents.id")) {
                        return StoreError::AlreadyExists(doc.id);
                    }
                    return StoreError::Conflict(msg.clone().unwrap_or_default());
                }
            }
            StoreError::Storage(format!("insert: {e}"))
        })?;

        Self::index_fts(conn, doc)?;
        Ok(())
    }

    /// Index an article document into the FTS table. Other collections are
    /// not full-text searchable.
    fn index_fts(conn: &Connection, doc: &Document) -> Result<(), StoreError> {
        if doc.collection != collections::ARTICLES {
            return Ok(());
        }
        let title = doc.str_field("title").unwrap_or_default();
        let abstract_text = doc.str_field("abstract").unwrap_or_default();
        let authors = match doc.payload.get("authors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        };
        conn.execute(
            "INSERT INTO docs_fts (doc_id, title, abstract, authors) VALUES (?1, ?2, ?3, ?4)",
            params![doc.id.to_string(), title, abstract_text, authors],
        )
        .map_err(|e| StoreError::Storage(format!("index_fts: {e}")))?;
        Ok(())
    }

    fn delete_fts(conn: &Connection, id: &str) -> Result<(), StoreError> {
        conn.execute("DELETE FROM docs_fts WHERE doc_id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("delete_fts: {e}")))?;
        Ok(())
    }

    fn get_in_conn(
        conn: &Connection,
        collection: &str,
        id: DocId,
    ) -> Result<Option<Document>, StoreError> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DOC_COLUMNS} FROM documents WHERE collection = ?1 AND id = ?2"
            ))
            .map_err(|e| StoreError::Storage(format!("prepare get: {e}")))?;
        stmt.query_row(params![collection, id.to_string()], Self::row_to_doc)
            .optional()
            .map_err(|e| StoreError::Storage(format!("get: {e}")))
    }

    fn row_to_doc(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let collection: String = row.get(1)?;
        let payload_json: String = row.get(2)?;
        let created_ms: i64 = row.get(3)?;
        let rev: i64 = row.get(4)?;

        let id = uuid::Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let payload: Value = serde_json::from_str(&payload_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let created = Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Document {
            id,
            collection,
            payload,
            created,
            rev,
        })
    }

    fn json_path(field: &str) -> Result<String, StoreError> {
        if field.is_empty()
            || !field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(StoreError::InvalidQuery(format!("bad field name: {field}")));
        }
        Ok(format!("$.{field}"))
    }

    fn apply_patch(conn: &Connection, id: &str, patch: &Patch) -> Result<(), StoreError> {
        match patch {
            Patch::Set(field, value) => {
                let path = Self::json_path(field)?;
                let value_json = serde_json::to_string(value)
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                conn.execute(
                    "UPDATE documents SET payload = json_set(payload, ?1, json(?2)) WHERE id = ?3",
                    params![path, value_json, id],
                )
                .map_err(|e| StoreError::Storage(format!("set: {e}")))?;
            }
            Patch::Unset(field) => {
                let path = Self::json_path(field)?;
                conn.execute(
                    "UPDATE documents SET payload = json_remove(payload, ?1) WHERE id = ?2",
                    params![path, id],
                )
                .map_err(|e| StoreError::Storage(format!("unset: {e}")))?;
            }
            Patch::Push(field, value) => {
                let path = Self::json_path(field)?;
                let append_path = format!("$.{field}[#]");
                let value_json = serde_json::to_string(value)
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                // Ensure the array exists, then append.
                conn.execute(
                    "UPDATE documents SET payload = json_insert(
                         json_set(payload, ?1, json(COALESCE(json_extract(payload, ?1), '[]'))),
                         ?2, json(?3)
                     ) WHERE id = ?4",
                    params![path, append_path, value_json, id],
                )
                .map_err(|e| StoreError::Storage(format!("push: {e}")))?;
            }
            Patch::Pull(field, value) => {
                let path = Self::json_path(field)?;
                conn.execute(
                    "UPDATE documents SET payload = json_set(payload, ?1, json(COALESCE(
                         (SELECT json_group_array(json_each.value)
                          FROM json_each(payload, ?1)
                          WHERE json_each.value <> ?2),
                         '[]'
                     ))) WHERE id = ?3",
                    params![path, value_to_sql(value), id],
                )
                .map_err(|e| StoreError::Storage(format!("pull: {e}")))?;
            }
        }
        Ok(())
    }

    fn patch_touches_fts(patches: &[Patch]) -> bool {
        patches.iter().any(|p| {
            let field = match p {
                Patch::Set(f, _) | Patch::Unset(f) | Patch::Push(f, _) | Patch::Pull(f, _) => f,
            };
            matches!(field.as_str(), "title" | "abstract" | "authors")
        })
    }
}

impl DocumentStore for SqliteStore {
    fn insert(&self, doc: Document) -> Result<DocId, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let id = doc.id;
        Self::insert_doc(&conn, &doc)?;
        Ok(id)
    }

    fn insert_batch(&self, docs: Vec<Document>) -> Result<Vec<DocId>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {e}")))?;

        let mut ids = Vec::with_capacity(docs.len());
        for doc in &docs {
            Self::insert_doc(&tx, doc)?;
            ids.push(doc.id);
        }

        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        Ok(ids)
    }

    fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::get_in_conn(&conn, collection, id)
    }

    fn find_in(&self, collection: &str, ids: &[DocId]) -> Result<Vec<Document>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {DOC_COLUMNS} FROM documents WHERE collection = ?1 AND id IN ({placeholders})"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Storage(format!("prepare find_in: {e}")))?;

        let mut bound: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(collection.to_string())];
        for id in ids {
            bound.push(Box::new(id.to_string()));
        }
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|p| p.as_ref()).collect();

        let docs = stmt
            .query_map(params_ref.as_slice(), Self::row_to_doc)
            .map_err(|e| StoreError::Storage(format!("find_in: {e}")))?
            .collect::<Result<Vec<Document>, _>>()
            .map_err(|e| StoreError::Storage(format!("find_in rows: {e}")))?;

        // Re-order to match the caller's id list; absent ids are skipped.
        let mut by_id: std::collections::HashMap<DocId, Document> =
            docs.into_iter().map(|d| (d.id, d)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn update(
        &self,
        collection: &str,
        id: DocId,
        patches: Vec<Patch>,
    ) -> Result<Document, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let id_str = id.to_string();

        if Self::get_in_conn(&conn, collection, id)?.is_none() {
            return Err(StoreError::NotFound(id));
        }

        // All patches to one document commit together.
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {e}")))?;

        for patch in &patches {
            Self::apply_patch(&tx, &id_str, patch)?;
        }
        tx.execute(
            "UPDATE documents SET rev = rev + 1 WHERE id = ?1",
            params![&id_str],
        )
        .map_err(|e| StoreError::Storage(format!("bump rev: {e}")))?;

        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;

        let updated = Self::get_in_conn(&conn, collection, id)?
            .ok_or(StoreError::NotFound(id))?;

        if collection == collections::ARTICLES && Self::patch_touches_fts(&patches) {
            Self::delete_fts(&conn, &id_str)?;
            Self::index_fts(&conn, &updated)?;
        }

        Ok(updated)
    }

    fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let id_str = id.to_string();

        let rows = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, &id_str],
            )
            .map_err(|e| StoreError::Storage(format!("delete: {e}")))?;

        if rows == 0 {
            return Err(StoreError::NotFound(id));
        }
        Self::delete_fts(&conn, &id_str)?;
        Ok(())
    }

    fn query(&self, collection: &str, q: &DocumentQuery) -> Result<Vec<Hit>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let compiled = compile_query(collection, q)?;

        let (score_select, join) = if compiled.join_fts {
            (
                format!(", {SCORE_EXPR}"),
                " JOIN docs_fts ON docs_fts.doc_id = documents.id",
            )
        } else {
            (String::new(), "")
        };

        let sql = format!(
            "SELECT {DOC_COLUMNS}{score_select} FROM documents{join} {} {} {}",
            compiled.where_clause, compiled.order_clause, compiled.limit_offset
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> = compiled
            .params
            .iter()
            .map(|p| p as &dyn rusqlite::types::ToSql)
            .collect();

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Storage(format!("prepare query: {e} (sql: {sql})")))?;

        let expose_score = compiled.join_fts && q.with_score;
        let hits = stmt
            .query_map(params_ref.as_slice(), |row| {
                let doc = Self::row_to_doc(row)?;
                let score = if expose_score { row.get(5)? } else { None };
                Ok(Hit { doc, score })
            })
            .map_err(|e| StoreError::Storage(format!("query: {e}")))?
            .collect::<Result<Vec<Hit>, _>>()
            .map_err(|e| StoreError::Storage(format!("query rows: {e}")))?;

        Ok(hits)
    }

    fn count(&self, collection: &str, q: &DocumentQuery) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Storage(e.to_string()))?;
        let compiled = compile_query(collection, q)?;

        let join = if compiled.join_fts {
            " JOIN docs_fts ON docs_fts.doc_id = documents.id"
        } else {
            ""
        };
        let sql = format!(
            "SELECT COUNT(*) FROM documents{join} {}",
            compiled.where_clause
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> = compiled
            .params
            .iter()
            .map(|p| p as &dyn rusqlite::types::ToSql)
            .collect();

        let count: i64 = conn
            .query_row(&sql, params_ref.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Storage(format!("count: {e}")))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, SortKey};
    use serde_json::json;

    fn article(title: &str, year: i64, abstract_text: &str, authors: &[&str]) -> Document {
        Document::new(
            collections::ARTICLES,
            json!({
                "title": title,
                "authors": authors,
                "year": year,
                "abstract": abstract_text,
                "citations": [],
            }),
        )
    }

    #[test]
    fn insert_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = article("Deep Learning", 2015, "Neural networks.", &["LeCun"]);
        let id = store.insert(doc.clone()).unwrap();

        let fetched = store.get(collections::ARTICLES, id).unwrap().unwrap();
        assert_eq!(fetched.payload, doc.payload);
        assert_eq!(fetched.rev, 0);
    }

    #[test]
    fn get_wrong_collection_misses() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(article("T", 2020, "", &["A"]))
            .unwrap();
        assert!(store.get(collections::CITATIONS, id).unwrap().is_none());
    }

    #[test]
    fn duplicate_id_is_already_exists() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = article("T", 2020, "", &["A"]);
        store.insert(doc.clone()).unwrap();
        assert!(matches!(
            store.insert(doc),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn duplicate_user_email_is_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(Document::new(
                collections::USERS,
                json!({"email": "ada@example.com", "name": "Ada"}),
            ))
            .unwrap();
        let second = Document::new(
            collections::USERS,
            json!({"email": "ada@example.com", "name": "Imposter"}),
        );
        assert!(matches!(
            store.insert(second),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn update_sets_fields_and_bumps_rev() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(article("Old Title", 2019, "", &["A"]))
            .unwrap();

        let updated = store
            .update(
                collections::ARTICLES,
                id,
                vec![
                    Patch::Set("title".into(), json!("New Title")),
                    Patch::Set("year".into(), json!(2020)),
                ],
            )
            .unwrap();

        assert_eq!(updated.str_field("title"), Some("New Title"));
        assert_eq!(updated.payload["year"], json!(2020));
        assert_eq!(updated.rev, 1);
    }

    #[test]
    fn push_and_pull_maintain_array_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(article("T", 2020, "", &["A"]))
            .unwrap();
        let (c1, c2) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        store
            .update(
                collections::ARTICLES,
                id,
                vec![Patch::Push("citations".into(), json!(c1.to_string()))],
            )
            .unwrap();
        let doc = store
            .update(
                collections::ARTICLES,
                id,
                vec![Patch::Push("citations".into(), json!(c2.to_string()))],
            )
            .unwrap();
        assert_eq!(
            doc.payload["citations"],
            json!([c1.to_string(), c2.to_string()])
        );

        let doc = store
            .update(
                collections::ARTICLES,
                id,
                vec![Patch::Pull("citations".into(), json!(c1.to_string()))],
            )
            .unwrap();
        assert_eq!(doc.payload["citations"], json!([c2.to_string()]));
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .update(
                collections::ARTICLES,
                uuid::Uuid::new_v4(),
                vec![Patch::Set("title".into(), json!("X"))],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_removes_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(article("T", 2020, "", &["A"]))
            .unwrap();
        store.delete(collections::ARTICLES, id).unwrap();
        assert!(store.get(collections::ARTICLES, id).unwrap().is_none());
        assert!(matches!(
            store.delete(collections::ARTICLES, id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn query_filters_and_sorts() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(article("Alpha", 2018, "", &["X"])).unwrap();
        store.insert(article("Beta", 2022, "", &["Y"])).unwrap();
        store.insert(article("Gamma", 2022, "", &["Z"])).unwrap();

        let q = DocumentQuery {
            predicates: vec![Predicate::Gte("year".into(), json!(2020))],
            sort: vec![SortKey::desc("year"), SortKey::asc("title")],
            ..Default::default()
        };
        let hits = store.query(collections::ARTICLES, &q).unwrap();
        let titles: Vec<_> = hits
            .iter()
            .map(|h| h.doc.str_field("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["Beta", "Gamma"]);
    }

    #[test]
    fn query_eq_matches_array_elements() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(article("Joint", 2020, "", &["Smith", "Jones"]))
            .unwrap();
        store.insert(article("Solo", 2020, "", &["Brown"])).unwrap();

        let q = DocumentQuery {
            predicates: vec![Predicate::Eq("authors".into(), json!("Jones"))],
            ..Default::default()
        };
        let hits = store.query(collections::ARTICLES, &q).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc.str_field("title"), Some("Joint"));
    }

    #[test]
    fn query_limit_offset_pages() {
        let store = SqliteStore::open_in_memory().unwrap();
        for year in 2000..2010 {
            store.insert(article(&format!("A{year}"), year, "", &["A"])).unwrap();
        }
        let q = DocumentQuery {
            sort: vec![SortKey::asc("year")],
            limit: Some(3),
            offset: Some(4),
            ..Default::default()
        };
        let hits = store.query(collections::ARTICLES, &q).unwrap();
        let years: Vec<_> = hits.iter().map(|h| h.doc.payload["year"].clone()).collect();
        assert_eq!(years, vec![json!(2004), json!(2005), json!(2006)]);
    }

    #[test]
    fn full_text_matches_and_scores() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(article(
                "Machine Learning Basics",
                2019,
                "Introductory text.",
                &["Ng"],
            ))
            .unwrap();
        store
            .insert(article("Quantum Chromodynamics", 2019, "Gluons.", &["Wilczek"]))
            .unwrap();

        let q = DocumentQuery {
            predicates: vec![Predicate::FullText("Learning".into())],
            with_score: true,
            ..Default::default()
        };
        let hits = store.query(collections::ARTICLES, &q).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc.str_field("title"), Some("Machine Learning Basics"));
        assert!(hits[0].score.unwrap() > 0.0);
    }

    #[test]
    fn title_match_outranks_abstract_match() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(article(
                "Unrelated Heading",
                2020,
                "This abstract mentions entropy once.",
                &["A"],
            ))
            .unwrap();
        store
            .insert(article("Entropy and Information", 2020, "", &["B"]))
            .unwrap();

        let q = DocumentQuery {
            predicates: vec![Predicate::FullText("entropy".into())],
            with_score: true,
            ..Default::default()
        };
        let hits = store.query(collections::ARTICLES, &q).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(
            hits[0].doc.str_field("title"),
            Some("Entropy and Information")
        );
        assert!(hits[0].score.unwrap() > hits[1].score.unwrap());
    }

    #[test]
    fn updated_title_is_reindexed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(article("Original", 2020, "", &["A"]))
            .unwrap();
        store
            .update(
                collections::ARTICLES,
                id,
                vec![Patch::Set("title".into(), json!("Spintronics Review"))],
            )
            .unwrap();

        let q = DocumentQuery {
            predicates: vec![Predicate::FullText("Spintronics".into())],
            ..Default::default()
        };
        assert_eq!(store.query(collections::ARTICLES, &q).unwrap().len(), 1);

        let q = DocumentQuery {
            predicates: vec![Predicate::FullText("Original".into())],
            ..Default::default()
        };
        assert!(store.query(collections::ARTICLES, &q).unwrap().is_empty());
    }

    #[test]
    fn find_in_preserves_requested_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.insert(article("A", 2020, "", &["X"])).unwrap();
        let b = store.insert(article("B", 2020, "", &["X"])).unwrap();
        let missing = uuid::Uuid::new_v4();

        let docs = store
            .find_in(collections::ARTICLES, &[b, missing, a])
            .unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.str_field("title").unwrap()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn insert_batch_is_all_or_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = article("One", 2020, "", &["A"]);
        let clash = Document {
            id: first.id,
            ..article("Two", 2021, "", &["B"])
        };
        assert!(store.insert_batch(vec![first, clash]).is_err());

        let q = DocumentQuery::default();
        assert_eq!(store.count(collections::ARTICLES, &q).unwrap(), 0);
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.db");
        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(article("Durable", 2020, "", &["A"])).unwrap()
        };
        let store = SqliteStore::open(&path).unwrap();
        let doc = store.get(collections::ARTICLES, id).unwrap().unwrap();
        assert_eq!(doc.str_field("title"), Some("Durable"));
    }
}
