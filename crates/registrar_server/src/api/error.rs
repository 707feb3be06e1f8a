//! Boundary error type and its HTTP mapping.
//!
//! Status codes: 401 authentication, 404 missing records or files, 422
//! validation and conflicts, 500 everything unexpected. 500 bodies never
//! carry internal details; those go to the log.

use crate::api::response::ErrorResponse;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use registrar_core::{ServiceError, ValidationErrors};
use thiserror::Error;

const VALIDATION_MESSAGE: &str = "The given data was invalid.";
const INTERNAL_MESSAGE: &str = "An internal error occurred.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid or unknown access token")]
    InvalidToken,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::Validation(_) | ServiceError::Conflict(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Service(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthenticated | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Field-level validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation(ValidationErrors::single(field, message)).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Service(ServiceError::Validation(errors)) => {
                ErrorResponse::with_errors(VALIDATION_MESSAGE, errors)
            }
            other if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!(
                    "event=http_error module=api status=error code={} error={}",
                    status.as_u16(),
                    other
                );
                ErrorResponse::new(INTERNAL_MESSAGE)
            }
            other => {
                if status == StatusCode::UNAUTHORIZED {
                    warn!("event=http_auth module=api status=error error={}", other);
                }
                ErrorResponse::new(other.to_string())
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

/// A path segment that does not parse as an id cannot name a record.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(format!("resource not found: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::field("file", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::field("file", format!("the upload could not be read: {err}"))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
