//! Bearer-token issuance, verification, and the route guard.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use folio_archive::{ArchiveError, PublicUser};
use folio_core::DocId;

use crate::response::ApiError;
use crate::AppState;

/// Signed token payload: the user's identity plus issue/expiry times.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Standard issuer: tokens live for one day.
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::days(1))
    }

    /// Hour-long tokens, used by test sessions.
    pub fn short_lived(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(1))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: DocId) -> Result<String, ArchiveError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ArchiveError::Internal(format!("token signing failed: {e}")))
    }

    /// Decode and validate a token, returning the user id it names. Every
    /// failure mode collapses into the same 401.
    pub fn verify(&self, token: &str) -> Result<DocId, ArchiveError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| unauthorized())?;
        uuid::Uuid::parse_str(&data.claims.sub).map_err(|_| unauthorized())
    }
}

fn unauthorized() -> ArchiveError {
    ArchiveError::Unauthorized("Access denied: invalid or expired token".into())
}

/// The authenticated user, injected into request extensions by the guard.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

/// Route guard for mutating endpoints. Requires `Authorization: Bearer
/// <token>`, verifies the signature and expiry, and confirms the user
/// still exists before letting the request through.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = bearer.ok_or_else(|| {
        ApiError(ArchiveError::Unauthorized(
            "Access denied: no token provided".into(),
        ))
    })?;

    let user_id = state.tokens.verify(token)?;
    let user = state
        .users
        .get(user_id)?
        .ok_or_else(|| ArchiveError::Unauthorized("Access denied: user no longer exists".into()))?;

    request.extensions_mut().insert(CurrentUser(user.public()));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_round_trip() {
        let issuer = TokenIssuer::new("secret");
        let user_id = uuid::Uuid::new_v4();
        let token = issuer.issue(user_id).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let issuer = TokenIssuer::new("secret");
        assert!(issuer.verify("not-a-token").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenIssuer::new("secret-a").issue(uuid::Uuid::new_v4()).unwrap();
        assert!(TokenIssuer::new("secret-b").verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the decoder's default leeway.
        let issuer = TokenIssuer::with_ttl("secret", Duration::seconds(-3600));
        let token = issuer.issue(uuid::Uuid::new_v4()).unwrap();
        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.status(), 401);
    }
}
