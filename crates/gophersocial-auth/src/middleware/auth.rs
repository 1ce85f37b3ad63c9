//! Bearer token parsing and the authenticated-user extractor.
//!
//! Token verification and identity resolution are composed by the server's
//! authentication middleware, which inserts an [`AuthContext`] into the
//! request extensions. Handlers then take [`CurrentUser`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::middleware::types::AuthContext;

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// `Unauthorized` if the header is missing, not UTF-8, uses another scheme
/// or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthorized("authorization header is missing"))?
        .to_str()
        .map_err(|_| AuthError::unauthorized("authorization header is malformed"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AuthError::unauthorized("authorization header is malformed"))?;

    if scheme != "Bearer" {
        return Err(AuthError::unauthorized("authorization header is malformed"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::unauthorized("empty bearer token"));
    }
    Ok(token)
}

// =============================================================================
// Current User Extractor
// =============================================================================

/// Axum extractor for the authenticated request context.
///
/// # Errors
///
/// `Unauthorized` if no authentication middleware ran for the route.
///
/// # Example
///
/// ```ignore
/// async fn handler(CurrentUser(auth): CurrentUser) -> impl IntoResponse {
///     Json(auth.user_context())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::unauthorized("request is not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_valid() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Basic YWRtaW46YWRtaW4=")).is_err());
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Bearer   ")).is_err());
        assert!(bearer_token(&headers("bearer abc")).is_err());
    }

    #[tokio::test]
    async fn test_current_user_requires_context() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    }
}
