//! Translation of raw query-string parameters into a document query:
//! full-text search, comparison filters, sorting, and pagination.

use serde_json::{json, Value};

use folio_core::{DocumentQuery, Predicate, SortKey};

use crate::error::ArchiveError;

/// Keys that drive the query itself and never become filters.
const RESERVED: [&str; 6] = ["q", "sort", "order", "page", "limit", "skip"];

/// Comparison operators recognized in `field[op]=value` filter keys.
const OPERATORS: [&str; 5] = ["gte", "gt", "lte", "lt", "in"];

pub const DEFAULT_LIMIT: usize = 100;

/// Build a list query from query-string pairs (in request order; for
/// repeated scalar keys the last occurrence wins).
///
/// - `q` switches the query to full-text search ranked by descending
///   relevance; an explicit `sort` is ignored while `q` is present.
/// - `sort` is a comma-separated field list taken literally, `-` prefix
///   meaning descending. Without `q` and `sort`, results order by `year`
///   descending then `title` ascending.
/// - `limit` falls back to 100 when invalid or below 1; `skip` falls back
///   to 0 when invalid or negative; a valid 1-based `page` overrides skip
///   as `(page - 1) * limit`, evaluated after limit is resolved.
/// - Every remaining key is an equality filter; `field[op]` keys with a
///   recognized operator become comparison predicates. Only bracketed
///   operator keys are rewritten; values are never inspected, so a value
///   that happens to contain `gte` stays intact.
///
/// Pure function of its input.
pub fn build_list_query(params: &[(String, String)]) -> Result<DocumentQuery, ArchiveError> {
    let last = |key: &str| {
        params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let mut predicates = Vec::new();
    let mut with_score = false;

    let text = last("q").filter(|s| !s.trim().is_empty());
    if let Some(text) = text {
        predicates.push(Predicate::FullText(text.to_string()));
        with_score = true;
    }

    let mut limit = DEFAULT_LIMIT;
    if let Some(raw) = last("limit") {
        limit = match raw.parse::<i64>() {
            Ok(n) if n >= 1 => n as usize,
            _ => DEFAULT_LIMIT,
        };
    }

    let mut skip = 0usize;
    if let Some(raw) = last("skip") {
        skip = match raw.parse::<i64>() {
            Ok(n) if n >= 0 => n as usize,
            _ => 0,
        };
    }

    // A valid page wins over skip; evaluated after limit is resolved.
    if let Some(raw) = last("page") {
        if let Ok(page) = raw.parse::<i64>() {
            if page > 0 {
                skip = (page as usize - 1) * limit;
            }
        }
    }

    let mut sort = Vec::new();
    if text.is_none() {
        if let Some(raw) = last("sort") {
            for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                // Taken literally: no check that the field exists.
                match field.strip_prefix('-') {
                    Some(f) => sort.push(SortKey::desc(f)),
                    None => sort.push(SortKey::asc(field)),
                }
            }
        }
        if sort.is_empty() {
            sort = vec![SortKey::desc("year"), SortKey::asc("title")];
        }
    }

    for (key, value) in params {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        match split_operator_key(key) {
            Some((field, op)) => predicates.push(operator_predicate(field, op, value)?),
            None => predicates.push(Predicate::Eq(key.clone(), coerce(value))),
        }
    }

    Ok(DocumentQuery {
        predicates,
        sort,
        limit: Some(limit),
        offset: Some(skip),
        with_score,
    })
}

/// Split a `field[op]` key into its parts. Keys without a bracket suffix
/// are plain equality filters.
fn split_operator_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let rest = &key[open + 1..];
    if !key.ends_with(']') || rest.len() < 2 {
        return None;
    }
    Some((&key[..open], &rest[..rest.len() - 1]))
}

fn operator_predicate(field: &str, op: &str, value: &str) -> Result<Predicate, ArchiveError> {
    if !OPERATORS.contains(&op) {
        return Err(ArchiveError::validation(
            format!("{field}[{op}]"),
            format!("unsupported filter operator: {op}"),
        ));
    }
    let field = field.to_string();
    Ok(match op {
        "gte" => Predicate::Gte(field, coerce(value)),
        "gt" => Predicate::Gt(field, coerce(value)),
        "lte" => Predicate::Lte(field, coerce(value)),
        "lt" => Predicate::Lt(field, coerce(value)),
        "in" => Predicate::In(field, value.split(',').map(coerce).collect()),
        _ => unreachable!("operator membership checked above"),
    })
}

/// Coerce a query-string scalar so numeric filters compare numerically.
fn coerce(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return json!(f);
    }
    match raw {
        "true" => json!(true),
        "false" => json!(false),
        _ => json!(raw),
    }
}
