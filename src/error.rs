//! HTTP error type shared by all handlers

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Per-field validation messages, keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Not found.")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// No `Authorization` header on an operation that requires one
    pub fn missing_credentials() -> Self {
        Self::Unauthorized(MISSING_CREDENTIALS.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, errors } => json!({
                "message": message,
                "errors": errors,
            }),
            ApiError::Unauthorized(detail) => json!({ "detail": detail }),
            ApiError::NotFound => json!({ "detail": "Not found." }),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                json!({ "detail": "Internal server error." })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Add a message to a field, creating the entry if needed
pub fn push_field_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::validation("Failed", FieldErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::missing_credentials().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_push_field_error_accumulates() {
        let mut errors = FieldErrors::new();
        push_field_error(&mut errors, "title", "first");
        push_field_error(&mut errors, "title", "second");
        push_field_error(&mut errors, "author", "third");
        assert_eq!(errors["title"], vec!["first", "second"]);
        assert_eq!(errors["author"], vec!["third"]);
    }
}
