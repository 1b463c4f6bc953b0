//! Error types for the Story Annotator server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::practice::ValidationError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid answers: {0}")]
    InvalidAnswers(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// Storage or programming failures, as opposed to caller mistakes
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Internal(_) | AppError::Database(_))
    }
}

/// Log a failed operation with the identifiers needed to trace it.
///
/// Internal failures keep their storage detail here; the HTTP response only
/// says that the operation failed.
pub fn log_failure(
    err: &AppError,
    operation: &str,
    story_id: Option<i64>,
    line_number: Option<i64>,
) {
    if err.is_internal() {
        tracing::error!(?story_id, ?line_number, error = %err, "{} failed", operation);
    } else {
        tracing::debug!(?story_id, ?line_number, error = %err, "{} rejected", operation);
    }
}

/// Error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_answers: Option<std::collections::BTreeMap<usize, usize>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::AlreadyExists(msg) => (StatusCode::CONFLICT, "already_exists", msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg.clone()),
            AppError::InvalidAnswers(e) => {
                (StatusCode::BAD_REQUEST, "invalid_answers", e.message.clone())
            }
            // Already logged with story and line by the failing operation
            AppError::Internal(msg) => {
                tracing::debug!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::debug!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let expected_answers = match self {
            AppError::InvalidAnswers(e) => Some(e.expected_answers),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            expected_answers,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_storage_errors_hide_detail() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
    }
}
