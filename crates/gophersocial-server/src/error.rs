//! Handler errors and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gophersocial_auth::AuthError;
use gophersocial_auth::middleware::SERVER_ERROR_MESSAGE;
use gophersocial_storage::StorageError;
use serde_json::json;

use crate::cache::CacheError;
use crate::credentials::CredentialError;
use crate::mailer::MailError;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The payload or query failed validation.
    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    /// Admission or authorization failure; rendered by [`AuthError`] itself.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Plain 401 with the generic message.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Auth(AuthError::unauthorized("invalid credentials"))
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        Self::Auth(AuthError::cache(err.to_string()))
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Auth(err) => return err.into_response(),
            Self::BadRequest(message) => {
                tracing::warn!(error = %message, "bad request");
                (StatusCode::BAD_REQUEST, message)
            }
            Self::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Storage(err) => match &err {
                StorageError::NotFound { .. } => {
                    tracing::debug!(error = %err, "not found");
                    (StatusCode::NOT_FOUND, "not found".to_string())
                }
                StorageError::DuplicateEmail
                | StorageError::DuplicateUsername
                | StorageError::InvalidQuery { .. } => {
                    tracing::warn!(error = %err, "bad request");
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                StorageError::AlreadyExists { .. } | StorageError::VersionConflict { .. } => {
                    tracing::warn!(error = %err, "conflict");
                    (StatusCode::CONFLICT, err.to_string())
                }
                StorageError::ConnectionError { .. } | StorageError::Internal { .. } => {
                    tracing::error!(error = %err, category = %err.category(), "storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        SERVER_ERROR_MESSAGE.to_string(),
                    )
                }
            },
            Self::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SERVER_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
