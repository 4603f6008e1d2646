//! Typed HTTP client for the folio API.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use folio_archive::{Article, ArticleHit, ArticleWithCitations, Citation, PublicUser};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(String),

    /// A non-2xx response; carries the server's envelope message.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Token and user returned by register/login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
    pub message: String,
}

/// Thin wrapper over reqwest carrying the base URL and an optional bearer
/// token. Methods mirror the REST surface one-to-one.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach the bearer token used for mutating requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Shape(e.to_string()))?;

        if !status.is_success() {
            let message = value["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(value)
    }

    fn extract<T: serde::de::DeserializeOwned>(value: Value, path: &str) -> Result<T, ClientError> {
        let inner = value["data"][path].clone();
        serde_json::from_value(inner)
            .map_err(|e| ClientError::Shape(format!("missing data.{path}: {e}")))
    }

    // --- Articles ---

    pub async fn list_articles(
        &self,
        query: &[(&str, &str)],
    ) -> Result<Vec<ArticleHit>, ClientError> {
        let value = self.send(Method::GET, "/articles", query, None).await?;
        Self::extract(value, "articles")
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, ClientError> {
        let value = self
            .send(Method::GET, &format!("/articles/{id}"), &[], None)
            .await?;
        Self::extract(value, "article")
    }

    pub async fn get_article_with_citations(
        &self,
        id: &str,
    ) -> Result<ArticleWithCitations, ClientError> {
        let value = self
            .send(
                Method::GET,
                &format!("/articles/{id}/with-citations"),
                &[],
                None,
            )
            .await?;
        Self::extract(value, "article")
    }

    pub async fn create_article(&self, draft: &Value) -> Result<Article, ClientError> {
        let value = self.send(Method::POST, "/articles", &[], Some(draft)).await?;
        Self::extract(value, "article")
    }

    pub async fn update_article(&self, id: &str, patch: &Value) -> Result<Article, ClientError> {
        let value = self
            .send(Method::PATCH, &format!("/articles/{id}"), &[], Some(patch))
            .await?;
        Self::extract(value, "article")
    }

    pub async fn delete_article(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &format!("/articles/{id}"), &[], None)
            .await?;
        Ok(())
    }

    // --- Citations ---

    pub async fn list_citations(
        &self,
        article_id: Option<&str>,
    ) -> Result<Vec<Citation>, ClientError> {
        let query: Vec<(&str, &str)> = article_id.map(|id| ("articleId", id)).into_iter().collect();
        let value = self.send(Method::GET, "/citations", &query, None).await?;
        Self::extract(value, "citations")
    }

    pub async fn create_citation(&self, draft: &Value) -> Result<Citation, ClientError> {
        let value = self
            .send(Method::POST, "/citations", &[], Some(draft))
            .await?;
        Self::extract(value, "citation")
    }

    pub async fn update_citation(&self, id: &str, patch: &Value) -> Result<Citation, ClientError> {
        let value = self
            .send(Method::PATCH, &format!("/citations/{id}"), &[], Some(patch))
            .await?;
        Self::extract(value, "citation")
    }

    pub async fn delete_citation(&self, id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &format!("/citations/{id}"), &[], None)
            .await?;
        Ok(())
    }

    // --- Auth ---

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        let body = json!({ "name": name, "email": email, "password": password });
        let value = self
            .send(Method::POST, "/auth/register", &[], Some(&body))
            .await?;
        serde_json::from_value(value).map_err(|e| ClientError::Shape(e.to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let body = json!({ "email": email, "password": password });
        let value = self
            .send(Method::POST, "/auth/login", &[], Some(&body))
            .await?;
        serde_json::from_value(value).map_err(|e| ClientError::Shape(e.to_string()))
    }
}
