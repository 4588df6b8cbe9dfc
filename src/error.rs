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
    /// No usable credential, or the vendor rejected a token grant.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The vendor sent a response we could not decode.
    #[error("Malformed vendor response: {0}")]
    Parse(String),

    /// Non-2xx transport status or a non-zero vendor envelope status.
    #[error("Withings API error: {0}")]
    Vendor(String),

    /// A notification resume was requested with nothing to resume from.
    #[error("Planning error: {0}")]
    Planning(String),

    /// Sub-measurements sharing a timestamp disagree on device or source.
    #[error("Inconsistent entries: {0}")]
    InconsistentEntries(String),

    /// A classified vendor entry was missing or mistyped a required field.
    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

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
            AppError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                Some(msg.clone()),
            ),
            AppError::Parse(msg) => (StatusCode::BAD_GATEWAY, "parse_error", Some(msg.clone())),
            AppError::Vendor(msg) => {
                (StatusCode::BAD_GATEWAY, "withings_error", Some(msg.clone()))
            }
            AppError::Planning(msg) => {
                (StatusCode::BAD_REQUEST, "planning_error", Some(msg.clone()))
            }
            AppError::InconsistentEntries(msg) => {
                tracing::error!(error = %msg, "Inconsistent vendor entries");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "inconsistent_entries",
                    None,
                )
            }
            AppError::Normalization(msg) => {
                tracing::error!(error = %msg, "Normalization failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "normalization_error",
                    None,
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
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
