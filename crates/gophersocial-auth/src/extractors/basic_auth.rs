//! Basic Auth extractor for operator routes.
//!
//! Operator routes (health, debug counters) are guarded by a single
//! configured username/password pair rather than by bearer tokens.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::config::BasicAuthConfig;
use crate::error::AuthError;

/// State container for Basic Auth: the expected credentials.
#[derive(Clone)]
pub struct BasicAuthState {
    credentials: Arc<BasicAuthConfig>,
}

impl BasicAuthState {
    /// Creates a new BasicAuthState.
    #[must_use]
    pub fn new(credentials: BasicAuthConfig) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        username.as_bytes() == self.credentials.username.as_bytes()
            && password.as_bytes() == self.credentials.password.as_bytes()
    }
}

impl std::fmt::Debug for BasicAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthState")
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

/// Proof that the request carried the operator credentials.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    /// The authenticated operator username.
    pub username: String,
}

impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
    BasicAuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let basic_auth_state = BasicAuthState::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidBasicCredentials)?;

        let (username, password) = parse_basic_auth(auth_header).map_err(|reason| {
            tracing::debug!(reason = %reason, "malformed basic credentials");
            AuthError::InvalidBasicCredentials
        })?;

        if !basic_auth_state.matches(&username, &password) {
            tracing::warn!(
                username = %username,
                endpoint = %parts.uri.path(),
                "basic auth rejected"
            );
            return Err(AuthError::InvalidBasicCredentials);
        }

        Ok(BasicAuth { username })
    }
}

/// Parse Basic Auth header.
///
/// Extracts credentials from "Basic <base64>" format.
fn parse_basic_auth(header: &str) -> Result<(String, String), String> {
    let credentials = header
        .strip_prefix("Basic ")
        .ok_or_else(|| "Authorization header must start with 'Basic '".to_string())?;

    let decoded = STANDARD
        .decode(credentials.trim())
        .map_err(|_| "Invalid base64 encoding in Authorization header".to_string())?;

    let credentials_str = String::from_utf8(decoded)
        .map_err(|_| "Invalid UTF-8 in decoded credentials".to_string())?;

    let (username, password) = credentials_str
        .split_once(':')
        .ok_or_else(|| "Credentials must be in format 'username:password'".to_string())?;

    Ok((username.to_string(), password.to_string()))
}
