//! Authentication context types.

use std::sync::Arc;

use gophersocial_storage::{Role, User};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::token::Claims;

// =============================================================================
// User Context
// =============================================================================

/// The public view of a user.
///
/// Unlike [`User`] this carries no password hash, so it is safe to put in a
/// response body or a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_active: bool,
    pub role: Role,
}

impl From<&User> for UserContext {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            is_active: user.is_active,
            role: user.role.clone(),
        }
    }
}

impl From<User> for UserContext {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

// =============================================================================
// Auth Context
// =============================================================================

/// Request-scoped result of authentication.
///
/// Inserted into the request extensions once the bearer token is verified
/// and its subject resolved. Both fields are behind `Arc` so the context is
/// cheap to clone into handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified token claims.
    pub claims: Arc<Claims>,

    /// The resolved, active user the token was issued to.
    pub user: Arc<User>,
}

impl AuthContext {
    #[must_use]
    pub fn new(claims: Claims, user: User) -> Self {
        Self {
            claims: Arc::new(claims),
            user: Arc::new(user),
        }
    }

    /// The authenticated user's id.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// The authenticated user's role.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.user.role
    }

    /// The public view of the authenticated user.
    #[must_use]
    pub fn user_context(&self) -> UserContext {
        UserContext::from(self.user.as_ref())
    }
}
