//! Field-level validation errors, collected per request.

use serde::{Deserialize, Serialize};

/// A single field violation, reported to the client in the `errors` list
/// of a 400 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = FieldError::new("year", "the year cannot be in the future");
        assert_eq!(err.to_string(), "year: the year cannot be in the future");
    }
}
