//! Error types for dts-he
//!
//! Every error body has the same shape:
//! `{"ok": false, "error": {"code": "...", "message": "..."}}`.
//! Messages for internal failures are generic; the detail goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dts_common::HeError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing tenant context (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Submitted data rejected by validation (400 or 409); hierarchy errors
    /// included
    #[error(transparent)]
    Rejected(HeError),

    /// Human-effects / hierarchy error from stored or submitted data
    #[error(transparent)]
    HumanEffects(#[from] HeError),

    /// dts-common infrastructure error
    #[error("Common error: {0}")]
    Common(#[from] dts_common::Error),
}

impl ApiError {
    /// Treat every `HeError` as caused by the request (imports)
    pub fn rejected(err: HeError) -> Self {
        ApiError::Rejected(err)
    }
}

fn he_status(err: &HeError) -> StatusCode {
    match err {
        HeError::DuplicateDimensionTuple { .. } => StatusCode::CONFLICT,
        HeError::RecordNotFound => StatusCode::NOT_FOUND,
        e if e.is_user_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    error!("Request failed: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "The request could not be completed".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Rejected(HeError::Database(ref e)) => internal(e),
            ApiError::Rejected(ref err) => {
                let status = match err {
                    HeError::DuplicateDimensionTuple { .. } => StatusCode::CONFLICT,
                    HeError::RecordNotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::HumanEffects(ref err) => match he_status(err) {
                StatusCode::INTERNAL_SERVER_ERROR => internal(err),
                status => (status, err.code(), err.to_string()),
            },
            ApiError::Common(dts_common::Error::NotFound(msg)) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Common(dts_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(dts_common::Error::Database(sqlx::Error::Database(ref db_err)))
                if db_err.is_foreign_key_violation() =>
            {
                (
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    "Referenced hazard or division does not exist".to_string(),
                )
            }
            ApiError::Common(ref err) => internal(err),
        };

        let body = Json(json!({
            "ok": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
