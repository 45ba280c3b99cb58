use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::conflict::ConflictResult;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schedule conflict")]
    ScheduleConflict(Box<ConflictResult>),

    #[error("Section {section} is at capacity")]
    CapacityExceeded { section: String },

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Partial write: {0}")]
    PartialWrite(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            // Carries the colliding entry so the operator sees exactly which
            // meeting blocks the proposal.
            AppError::ScheduleConflict(result) => {
                let body = Json(serde_json::json!({
                    "error": "Conflict",
                    "message": "proposed schedule collides with an existing entry",
                    "conflict": *result,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::CapacityExceeded { section } => (
                StatusCode::CONFLICT,
                format!("section {section} is at capacity"),
            ),
            AppError::TransactionAborted(reason) => {
                error!("transaction aborted: {}", reason);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("transaction aborted: {reason}"),
                )
            }
            AppError::PartialWrite(reason) => {
                error!("partial write after committed enrollment: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("enrollment recorded but follow-up write failed: {reason}"),
                )
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
