// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Poll has expired")]
    PollExpired,

    #[error("Already voted on this poll")]
    AlreadyVoted,

    /// A uniqueness constraint in the store rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to create poll")]
    PollCreateFailed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// User-facing message for a rejected poll submission.
    pub const INVALID_POLL: &'static str = "Please enter a question and at least 2 options";

    /// User-facing message when the store refuses a new poll.
    pub const CREATE_FAILED: &'static str = "Failed to create poll. Please try again.";

    /// True for store uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::PollExpired => (
                StatusCode::CONFLICT,
                "poll_expired",
                Some("This poll has expired.".to_string()),
            ),
            AppError::AlreadyVoted => (StatusCode::CONFLICT, "already_voted", None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::PollCreateFailed => (
                StatusCode::BAD_GATEWAY,
                "create_failed",
                Some(Self::CREATE_FAILED.to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
