//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use folio_archive::{ArchiveError, ArticleDraft, CitationDraft, CitationPatch, UserDraft};

use crate::response::{ApiError, Envelope};
use crate::AppState;

/// Deserialize a request body that has already been parsed as JSON,
/// reporting shape problems through the validation envelope instead of the
/// extractor's plain-text rejection.
fn parse_body<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ArchiveError::validation("body", format!("invalid request body: {e}")).into())
}

// ============================================================================
// Articles
// ============================================================================

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let articles = state.articles.list(&params)?;
    Ok(Json(Envelope::success_with_results(
        articles.len(),
        json!({ "articles": articles }),
    )))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.articles.get(&id)?;
    Ok(Json(Envelope::success(json!({ "article": article }))))
}

pub async fn get_article_with_citations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.articles.get_with_citations(&id)?;
    Ok(Json(Envelope::success(json!({ "article": article }))))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let draft: ArticleDraft = parse_body(body)?;
    let article = state.articles.create(draft)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(json!({ "article": article }))),
    ))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let patch: ArticleDraft = parse_body(body)?;
    let article = state.articles.update(&id, patch)?;
    Ok(Json(Envelope::success(json!({ "article": article }))))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.articles.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Citations
// ============================================================================

pub async fn create_citation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let draft: CitationDraft = parse_body(body)?;
    let citation = state.citations.create(draft)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(json!({ "citation": citation }))),
    ))
}

pub async fn list_citations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let article_id = params
        .iter()
        .rev()
        .find(|(k, _)| k == "articleId")
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty());
    let citations = state.citations.list(article_id)?;
    Ok(Json(Envelope::success_with_results(
        citations.len(),
        json!({ "citations": citations }),
    )))
}

pub async fn get_citation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let citation = state.citations.get(&id)?;
    Ok(Json(Envelope::success(json!({ "citation": citation }))))
}

pub async fn update_citation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let patch: CitationPatch = parse_body(body)?;
    let citation = state.citations.update(&id, patch)?;
    Ok(Json(Envelope::success(json!({ "citation": citation }))))
}

pub async fn delete_citation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.citations.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let draft: UserDraft = parse_body(body)?;
    let user = state.users.register(draft)?;
    let token = state.tokens.issue(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration completed successfully",
            "token": token,
            "user": user.public(),
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = parse_body(body)?;
    let (email, password) = match (&request.email, &request.password) {
        (Some(e), Some(p)) => (e.as_str(), p.as_str()),
        _ => return Err(invalid_credentials()),
    };

    // One generic message for unknown email and wrong password alike.
    let user = state
        .users
        .find_by_email(email)?
        .ok_or_else(invalid_credentials)?;
    if !state.users.verify_password(&user, password) {
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(user.id)?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user.public(),
    })))
}

fn invalid_credentials() -> ApiError {
    ArchiveError::Unauthorized("Invalid credentials".into()).into()
}

// ============================================================================
// System
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn api_root() -> impl IntoResponse {
    Json(json!({ "message": "folio API running" }))
}
