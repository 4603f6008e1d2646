//! Folio REST API server.
//!
//! Route table, shared state, and the serve loop; handlers live in
//! [`http`], the auth guard in [`auth`].

pub mod auth;
pub mod config;
pub mod http;
pub mod response;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use folio_archive::{ArticleRepository, CitationRepository, UserRepository};
use folio_core::DocumentStore;

use crate::auth::TokenIssuer;
use crate::config::Config;

/// Shared application state: the repositories (all holding the same
/// injected store handle) and the token issuer.
pub struct AppState {
    pub articles: Arc<ArticleRepository>,
    pub citations: CitationRepository,
    pub users: UserRepository,
    pub tokens: TokenIssuer,
    allowed_origin: String,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let articles = Arc::new(ArticleRepository::new(store.clone()));
        let citations = CitationRepository::new(store.clone(), articles.clone());
        let users = UserRepository::new(store);
        Self {
            articles,
            citations,
            users,
            tokens: TokenIssuer::new(&config.jwt_secret),
            allowed_origin: config.allowed_origin.clone(),
        }
    }
}

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        // Article reads
        .route("/articles", get(http::list_articles))
        .route("/articles/{id}/with-citations", get(http::get_article_with_citations))
        .route("/articles/{id}", get(http::get_article))
        // Citation reads
        .route("/citations", get(http::list_citations))
        .route("/citations/{id}", get(http::get_citation))
        // Auth
        .route("/auth/register", post(http::register))
        .route("/auth/login", post(http::login))
        // System
        .route("/health", get(http::health))
        .route("/", get(http::api_root));

    let protected = Router::new()
        .route("/articles", post(http::create_article))
        .route("/articles/{id}", patch(http::update_article))
        .route("/articles/{id}", delete(http::delete_article))
        .route("/citations", post(http::create_citation))
        .route("/citations/{id}", patch(http::update_citation))
        .route("/citations/{id}", delete(http::delete_citation))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let cors = cors_layer(&state.allowed_origin);

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    if allowed_origin == "*" {
        return CorsLayer::permissive();
    }
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(%allowed_origin, "unparseable CORS origin, allowing any");
            CorsLayer::new().allow_origin(Any)
        }
    }
}

/// Start the server. Returns once the listener stops, either on error or
/// after a shutdown signal.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("folio server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("shutdown signal received");
}
