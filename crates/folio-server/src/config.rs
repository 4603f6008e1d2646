//! Environment configuration for the server process.

use std::env;

/// Runtime configuration, loaded once at startup and passed explicitly to
/// whatever needs it. No global state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub addr: String,
    /// Database path, or `:memory:` for an ephemeral store.
    pub database: String,
    /// HMAC secret for signing bearer tokens.
    pub jwt_secret: String,
    /// Origin allowed by CORS; `*` relaxes to any origin.
    pub allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            addr: env::var("FOLIO_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database: env::var("FOLIO_DB").unwrap_or_else(|_| "folio.db".to_string()),
            jwt_secret: env::var("FOLIO_JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-change-me".to_string()),
            allowed_origin: env::var("FOLIO_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }
}
