//! Authentication and authorization error types.
//!
//! This module defines every error the admission pipeline can produce. The
//! HTTP mapping lives in [`crate::middleware::error`].

use std::fmt;
use std::time::Duration;

use gophersocial_storage::StorageError;

use crate::token::JwtError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request carries no usable credentials.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// The bearer token failed verification.
    #[error(transparent)]
    Token(#[from] JwtError),

    /// Basic credentials are missing or do not match.
    #[error("invalid basic credentials")]
    InvalidBasicCredentials,

    /// The actor is authenticated but lacks the privilege for the action.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Description of the denied action.
        message: String,
    },

    /// The rate limiter denied the request.
    #[error("rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited {
        /// Hint for when the key will be admitted again.
        retry_after: Duration,
    },

    /// A role name could not be resolved.
    #[error("role not found: {role}")]
    RoleNotFound {
        /// The unknown role name.
        role: String,
    },

    /// The token subject does not resolve to an active user.
    #[error("user not found: {id}")]
    UserNotFound {
        /// The subject id.
        id: i64,
    },

    /// The durable store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The identity cache failed.
    #[error("cache error: {message}")]
    Cache {
        /// Description of the cache error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// Identity resolution did not finish before the request deadline.
    #[error("request deadline exceeded")]
    Timeout,
}

impl AuthError {
    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `RateLimited` error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Creates a new `RoleNotFound` error.
    #[must_use]
    pub fn role_not_found(role: impl Into<String>) -> Self {
        Self::RoleNotFound { role: role.into() }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Cache` error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error is caused by the caller (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Token(err) => err.is_credential_error(),
            Self::Unauthorized { .. }
            | Self::InvalidBasicCredentials
            | Self::Forbidden { .. }
            | Self::RateLimited { .. }
            | Self::UserNotFound { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the error is a server-side fault (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Token(err) if !err.is_credential_error() => ErrorCategory::Server,
            Self::Unauthorized { .. }
            | Self::Token(_)
            | Self::InvalidBasicCredentials
            | Self::UserNotFound { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::RoleNotFound { .. }
            | Self::Storage { .. }
            | Self::Cache { .. }
            | Self::Internal { .. }
            | Self::Timeout => ErrorCategory::Server,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credentials missing or invalid.
    Authentication,
    /// Authenticated but not permitted.
    Authorization,
    /// Admission denied by the rate limiter.
    RateLimit,
    /// Server-side fault.
    Server,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
        }
    }
}
