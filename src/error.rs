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
///
/// The participation preconditions (full, already joined, finished, not a
/// participant) get their own variants so clients can show the matching
/// informational alert instead of a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Meetup is full")]
    MeetupFull,

    #[error("Already joined this meetup")]
    AlreadyJoined,

    #[error("Meetup has already finished")]
    MeetupFinished,

    #[error("Meetup has not finished yet")]
    NotFinished,

    #[error("Not a participant of this meetup")]
    NotParticipant,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Mail relay error: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
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
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::MeetupFull => {
                (StatusCode::CONFLICT, "meetup_full", Some(self.to_string()))
            }
            AppError::AlreadyJoined => (
                StatusCode::CONFLICT,
                "already_joined",
                Some(self.to_string()),
            ),
            AppError::MeetupFinished => (
                StatusCode::CONFLICT,
                "meetup_finished",
                Some(self.to_string()),
            ),
            AppError::NotFinished => {
                (StatusCode::CONFLICT, "not_finished", Some(self.to_string()))
            }
            AppError::NotParticipant => (
                StatusCode::CONFLICT,
                "not_participant",
                Some(self.to_string()),
            ),
            AppError::EmailTaken => (StatusCode::CONFLICT, "email_taken", Some(self.to_string())),
            AppError::Mail(msg) => (StatusCode::BAD_GATEWAY, "mail_error", Some(msg.clone())),
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
