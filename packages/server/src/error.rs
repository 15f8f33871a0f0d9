use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::store::ItemError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `INVALID_PATH`,
    /// `INVALID_CURSOR`, `TOKEN_MISSING`, `TOKEN_INVALID`, `NOT_FOUND`,
    /// `CONFLICT`, `METHOD_NOT_ALLOWED`, `PAYLOAD_TOO_LARGE`, `UNDECODABLE_CONTENT`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "INVALID_PATH")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Path contains an empty segment")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    InvalidPath(String),
    InvalidCursor(String),
    TokenMissing,
    TokenInvalid,
    NotFound(String),
    Conflict(String),
    MethodNotAllowed(String),
    PayloadTooLarge(String),
    Undecodable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::InvalidPath(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_PATH",
                    message: msg,
                },
            ),
            AppError::InvalidCursor(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_CURSOR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::MethodNotAllowed(msg) => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody {
                    code: "METHOD_NOT_ALLOWED",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::Undecodable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    code: "UNDECODABLE_CONTENT",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { actual, limit } => AppError::PayloadTooLarge(
                format!("Content is {actual} bytes, the limit is {limit} bytes"),
            ),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::InvalidPath(e) => AppError::InvalidPath(e.to_string()),
            ItemError::InvalidLimit(msg) => AppError::Validation(msg),
            ItemError::InvalidCursor(e) => AppError::InvalidCursor(e.to_string()),
            ItemError::Conflict(path) => AppError::Conflict(format!("Item already exists: {path}")),
            ItemError::NotFound(path) => AppError::NotFound(format!("Item not found: {path}")),
            ItemError::Undecodable(path) => AppError::Undecodable(format!(
                "Content of {path} is not a recognized domain object"
            )),
            ItemError::Database(e) => e.into(),
            ItemError::Storage(e) => e.into(),
        }
    }
}
