//! Request pipeline middleware.
//!
//! Order on a protected post route, outermost first:
//!
//! ```text
//! request_id → trace → rate_limit_middleware → authentication_middleware
//!     → post_context_middleware → check_post_ownership → handler
//! ```

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, State, rejection::PathRejection},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gophersocial_auth::middleware::bearer_token;
use gophersocial_auth::{AuthContext, AuthError, CurrentUser, RolePrecedence};
use gophersocial_storage::{Post, User};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
static TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Request id carried in the request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub HeaderValue);

// =============================================================================
// Request id
// =============================================================================

/// Propagates `x-request-id`, generating one when the client sent none.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(&REQUEST_ID)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(id) = &id {
        req.extensions_mut().insert(RequestId(id.clone()));
    }

    let mut res = next.run(req).await;

    if let Some(id) = id {
        res.headers_mut().insert(REQUEST_ID.clone(), id);
    }
    res
}

// =============================================================================
// Rate limiting
// =============================================================================

/// Client key for the limiter: `True-Client-IP`, then `X-Real-IP`, then the
/// first `X-Forwarded-For` entry, then the peer address.
pub fn client_key(req: &Request<Body>) -> String {
    let headers = req.headers();

    let header_ip = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header_ip(&TRUE_CLIENT_IP)
        .or_else(|| header_ip(&X_REAL_IP))
        .or_else(|| header_ip(&X_FORWARDED_FOR))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admits or rejects the request before any other work is done.
///
/// A denied request counts against nothing else; an admitted one keeps its
/// quota even if a later stage fails.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let settings = &state.config.auth.rate_limiter;
    if !settings.enabled {
        return next.run(req).await;
    }

    let key = client_key(&req);
    let decision = state.limiter.allow(&key);
    if decision.admitted {
        return next.run(req).await;
    }

    tracing::warn!(
        client = %key,
        method = %req.method(),
        path = %req.uri().path(),
        "rate limit exceeded"
    );
    AuthError::rate_limited(decision.retry_after.unwrap_or(settings.time_frame)).into_response()
}

// =============================================================================
// Authentication
// =============================================================================

/// Verifies the bearer token and inserts the caller's [`AuthContext`].
///
/// Identity resolution runs under the configured request deadline.
pub async fn authentication_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = {
        let token = bearer_token(req.headers())?;
        state.authenticator.verify(token).map_err(|e| {
            tracing::debug!(error = %e, path = %req.uri().path(), "token rejected");
            e
        })?
    };
    let user_id = claims.subject_id()?;

    let user = tokio::time::timeout(
        state.config.server.request_timeout,
        resolve_user(&state, user_id),
    )
    .await
    .map_err(|_| {
        tracing::warn!(user_id, "identity resolution timed out");
        AuthError::Timeout
    })??;

    tracing::debug!(user_id, role = %user.role.name, "request authenticated");
    req.extensions_mut().insert(AuthContext::new(claims, user));
    Ok(next.run(req).await)
}

/// Loads an active user, reading through the identity cache when enabled.
///
/// # Errors
///
/// `UserNotFound` for unknown or inactive users, `Cache` / `Storage` when a
/// backend fails. A failing cache is not treated as a miss.
pub async fn resolve_user(state: &AppState, id: i64) -> Result<User, AuthError> {
    let Some(cache) = &state.user_cache else {
        return load_user(state, id).await;
    };

    if let Some(user) = cache
        .get(id)
        .await
        .map_err(|e| AuthError::cache(e.to_string()))?
    {
        return Ok(user);
    }

    let user = load_user(state, id).await?;
    cache
        .set(&user)
        .await
        .map_err(|e| AuthError::cache(e.to_string()))?;
    Ok(user)
}

async fn load_user(state: &AppState, id: i64) -> Result<User, AuthError> {
    state.users.get_by_id(id).await.map_err(|e| {
        if e.is_not_found() {
            AuthError::UserNotFound { id }
        } else {
            AuthError::from(e)
        }
    })
}

// =============================================================================
// Post context and ownership
// =============================================================================

/// Loads the post addressed by the `{id}` path segment into the request
/// extensions.
pub async fn post_context_middleware(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Path(id) = path.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let post: Post = state.posts.get_by_id(id).await?;
    req.extensions_mut().insert(post);
    Ok(next.run(req).await)
}

/// State for [`check_post_ownership`]: the role a non-owner needs.
#[derive(Clone)]
pub struct OwnershipGuard {
    precedence: RolePrecedence,
    required_role: &'static str,
}

impl OwnershipGuard {
    #[must_use]
    pub fn new(precedence: RolePrecedence, required_role: &'static str) -> Self {
        Self {
            precedence,
            required_role,
        }
    }
}

/// Lets the post owner through, and anyone at least as privileged as the
/// guard's required role.
pub async fn check_post_ownership(
    State(guard): State<OwnershipGuard>,
    CurrentUser(auth): CurrentUser,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let owner_id = req
        .extensions()
        .get::<Post>()
        .map(|post| post.user_id)
        .ok_or_else(|| ApiError::internal("post context missing"))?;

    guard
        .precedence
        .authorize(&auth.user, owner_id, guard.required_role)
        .await?;
    Ok(next.run(req).await)
}
