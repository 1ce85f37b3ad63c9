//! Error response handling for the admission pipeline.
//!
//! Every error renders as `{"error": "<message>"}`. Server-side faults get an
//! opaque message; their detail only goes to the log.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Message sent for every 5xx response.
pub const SERVER_ERROR_MESSAGE: &str = "the server encountered a problem";

/// `WWW-Authenticate` challenge for Basic-protected routes.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

const BEARER_CHALLENGE: &str = r#"Bearer realm="gophersocial", error="invalid_token""#;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);

        let message = if status.is_server_error() {
            tracing::error!(
                error = %self,
                category = %self.category(),
                status = status.as_u16(),
                "request failed"
            );
            SERVER_ERROR_MESSAGE.to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };

        let mut headers = HeaderMap::new();
        match &self {
            Self::InvalidBasicCredentials => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BASIC_CHALLENGE),
                );
            }
            Self::RateLimited { retry_after } => {
                headers.insert(header::RETRY_AFTER, retry_after_value(retry_after.as_secs()));
            }
            _ if status == StatusCode::UNAUTHORIZED => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BEARER_CHALLENGE),
                );
            }
            _ => {}
        }

        (status, headers, Json(json!({ "error": message }))).into_response()
    }
}

/// HTTP status for an auth error.
#[must_use]
pub fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Token(err) if !err.is_credential_error() => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Unauthorized { .. }
        | AuthError::Token(_)
        | AuthError::InvalidBasicCredentials
        | AuthError::UserNotFound { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AuthError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::RoleNotFound { .. }
        | AuthError::Storage { .. }
        | AuthError::Cache { .. }
        | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `Retry-After` in whole seconds, never below one.
fn retry_after_value(seconds: u64) -> HeaderValue {
    HeaderValue::from(seconds.max(1))
}
