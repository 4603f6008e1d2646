//! Response envelope and centralized error serialization.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use folio_archive::{ArchiveError, FieldError};

/// The uniform success/failure envelope of the API.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            status: "success",
            results: None,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn success_with_results(results: usize, data: Value) -> Self {
        Self {
            results: Some(results),
            ..Self::success(data)
        }
    }
}

/// Newtype bridging the archive's error taxonomy into an HTTP response.
///
/// The match on the taxonomy lives in [`ArchiveError::status`] and
/// [`ArchiveError::is_operational`]; this layer only serializes. Internal
/// errors are logged server-side and the client sees a generic message.
#[derive(Debug)]
pub struct ApiError(pub ArchiveError);

impl From<ArchiveError> for ApiError {
    fn from(e: ArchiveError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (class, message) = if self.0.is_operational() {
            let class = if status.is_client_error() { "fail" } else { "error" };
            (class, self.0.to_string())
        } else {
            tracing::error!(error = %self.0, "unhandled internal error");
            ("error", "Something went very wrong!".to_string())
        };

        let errors = self.0.field_errors().map(|e| e.to_vec());
        let body = Envelope {
            status: class,
            results: None,
            data: None,
            message: Some(message),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_serializes_field_list() {
        let err = ApiError(ArchiveError::Validation(vec![FieldError::new(
            "year",
            "year must be between 1800 and 2026",
        )]));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_is_masked() {
        let err = ApiError(ArchiveError::Internal("connection pool exploded".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_omits_empty_sections() {
        let encoded =
            serde_json::to_value(Envelope::success(serde_json::json!({"article": {}}))).unwrap();
        assert_eq!(encoded["status"], "success");
        assert!(encoded.get("results").is_none());
        assert!(encoded.get("message").is_none());
        assert!(encoded.get("errors").is_none());
    }
}
