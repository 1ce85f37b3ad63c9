//! Role precedence authorizer.

use std::sync::Arc;

use gophersocial_storage::{Role, RoleStorage, User};

use crate::{AuthError, AuthResult};

/// Compares an actor's role with a required role by precedence level.
#[derive(Clone)]
pub struct RolePrecedence {
    roles: Arc<dyn RoleStorage>,
}

impl RolePrecedence {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleStorage>) -> Self {
        Self { roles }
    }

    /// Returns whether `actor_role` is at least as privileged as the role
    /// named `required`.
    ///
    /// # Errors
    ///
    /// `RoleNotFound` if `required` is unknown, `Storage` if the lookup fails.
    pub async fn check_precedence(&self, actor_role: &Role, required: &str) -> AuthResult<bool> {
        let required_role = self.roles.get_by_name(required).await.map_err(|e| {
            if e.is_not_found() {
                AuthError::role_not_found(required)
            } else {
                AuthError::from(e)
            }
        })?;

        Ok(actor_role.level >= required_role.level)
    }

    /// Authorizes `actor` to act on a resource owned by `owner_id`.
    ///
    /// Owners are always allowed and the role store is not consulted for
    /// them. Everyone else needs a role at least as privileged as `required`.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the actor is neither the owner nor privileged enough;
    /// lookup errors from [`Self::check_precedence`] otherwise.
    pub async fn authorize(&self, actor: &User, owner_id: i64, required: &str) -> AuthResult<()> {
        if actor.id == owner_id {
            return Ok(());
        }

        if self.check_precedence(&actor.role, required).await? {
            return Ok(());
        }

        tracing::info!(
            user_id = actor.id,
            role = %actor.role.name,
            required_role = %required,
            owner_id,
            "authorization denied"
        );
        Err(AuthError::forbidden(format!(
            "role '{}' may not act on resources owned by another user",
            actor.role.name
        )))
    }
}

impl std::fmt::Debug for RolePrecedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolePrecedence").finish_non_exhaustive()
    }
}
