use rusqlite::types::Value as SqlValue;

use crate::query::{DocumentQuery, Predicate, SortKey};
use crate::store::StoreError;

/// Compiled SQL fragments with bound parameters.
pub(crate) struct CompiledQuery {
    /// Whether the statement must join the FTS table (full-text predicate).
    pub join_fts: bool,
    pub where_clause: String,
    pub params: Vec<SqlValue>,
    pub order_clause: String,
    pub limit_offset: String,
}

/// Translate a DocumentQuery into SQL fragments.
///
/// The collection filter is always the first condition and the first bound
/// parameter. Field names are interpolated into the statement text, so they
/// are gated through [`field_to_column`] before use.
pub(crate) fn compile_query(
    collection: &str,
    q: &DocumentQuery,
) -> Result<CompiledQuery, StoreError> {
    let mut params = vec![SqlValue::Text(collection.to_string())];
    let mut conditions = vec!["documents.collection = ?".to_string()];
    let mut join_fts = false;

    for pred in &q.predicates {
        let (sql, pred_params, is_fts) = compile_predicate(pred)?;
        conditions.push(sql);
        params.extend(pred_params);
        join_fts |= is_fts;
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    let order_clause = compile_sort(&q.sort, join_fts)?;

    let mut limit_offset = String::new();
    match (q.limit, q.offset) {
        (Some(limit), Some(offset)) => {
            limit_offset = format!("LIMIT {} OFFSET {}", limit, offset);
        }
        (Some(limit), None) => limit_offset.push_str(&format!("LIMIT {}", limit)),
        (None, Some(offset)) => limit_offset.push_str(&format!("LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }

    Ok(CompiledQuery {
        join_fts,
        where_clause,
        params,
        order_clause,
        limit_offset,
    })
}

fn compile_predicate(pred: &Predicate) -> Result<(String, Vec<SqlValue>, bool), StoreError> {
    let mut params = Vec::new();
    let sql = match pred {
        Predicate::Eq(field, value) => {
            let col = field_to_column(field)?;
            if is_payload_field(field) {
                // Array-aware equality: a scalar operand matches an
                // array-valued field when any element equals it.
                params.push(value_to_sql(value));
                params.push(value_to_sql(value));
                format!(
                    "({col} = ? OR EXISTS (SELECT 1 FROM json_each(documents.payload, '$.{field}') WHERE json_each.value = ?))"
                )
            } else {
                params.push(value_to_sql(value));
                format!("{col} = ?")
            }
        }
        Predicate::Gt(field, value) => {
            let col = field_to_column(field)?;
            params.push(value_to_sql(value));
            format!("{col} > ?")
        }
        Predicate::Gte(field, value) => {
            let col = field_to_column(field)?;
            params.push(value_to_sql(value));
            format!("{col} >= ?")
        }
        Predicate::Lt(field, value) => {
            let col = field_to_column(field)?;
            params.push(value_to_sql(value));
            format!("{col} < ?")
        }
        Predicate::Lte(field, value) => {
            let col = field_to_column(field)?;
            params.push(value_to_sql(value));
            format!("{col} <= ?")
        }
        Predicate::In(field, values) => {
            let col = field_to_column(field)?;
            let placeholders: Vec<&str> = values
                .iter()
                .map(|v| {
                    params.push(value_to_sql(v));
                    "?"
                })
                .collect();
            format!("{col} IN ({})", placeholders.join(", "))
        }
        Predicate::FullText(text) => {
            params.push(SqlValue::Text(fts_query(text)));
            return Ok(("docs_fts MATCH ?".to_string(), params, true));
        }
    };
    Ok((sql, params, false))
}

fn compile_sort(sorts: &[SortKey], join_fts: bool) -> Result<String, StoreError> {
    if sorts.is_empty() {
        // Full-text queries with no explicit sort rank by relevance.
        if join_fts {
            return Ok("ORDER BY score DESC".to_string());
        }
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(sorts.len());
    for s in sorts {
        let col = field_to_column(&s.field)?;
        let dir = if s.ascending { "ASC" } else { "DESC" };
        parts.push(format!("{col} {dir}"));
    }
    Ok(format!("ORDER BY {}", parts.join(", ")))
}

/// Whether the field lives in the JSON payload (as opposed to a metadata
/// column on the documents table).
fn is_payload_field(field: &str) -> bool {
    !matches!(field, "id" | "created" | "createdAt" | "rev")
}

/// Map a field name to a SQL column expression.
///
/// Filter and sort fields originate in user query strings, so anything
/// outside `[A-Za-z0-9_]` is rejected rather than interpolated.
fn field_to_column(field: &str) -> Result<String, StoreError> {
    match field {
        "id" => Ok("documents.id".to_string()),
        "created" | "createdAt" => Ok("documents.created".to_string()),
        "rev" => Ok("documents.rev".to_string()),
        f if is_safe_field(f) => Ok(format!("json_extract(documents.payload, '$.{f}')")),
        f => Err(StoreError::InvalidQuery(format!("bad field name: {f}"))),
    }
}

fn is_safe_field(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build an FTS5 MATCH expression from free text: each whitespace-separated
/// term is quoted as a literal and the terms are OR'd, so any matching term
/// qualifies a document (ranking still favors documents matching more).
fn fts_query(text: &str) -> String {
    text.split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Convert a JSON value to a rusqlite parameter.
pub(crate) fn value_to_sql(value: &serde_json::Value) -> SqlValue {
    use serde_json::Value;
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            SqlValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
    }
}
