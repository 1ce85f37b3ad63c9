//! Registration and token issuing.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use gophersocial_auth::{AuthError, UserContext};
use gophersocial_storage::NewUser;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{check_email, check_len};
use crate::credentials::{hash_password, hash_token, new_invitation_token, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::mailer::{USER_WELCOME_TEMPLATE, send_with_retry};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterUserPayload {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserPayload {
    fn validate(&self) -> ApiResult<()> {
        check_len("username", &self.username, 1, 100)?;
        check_email(&self.email)?;
        check_len("password", &self.password, 3, 72)
    }
}

/// A freshly registered user and the plain activation token.
#[derive(Debug, Serialize)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: UserContext,
    pub token: String,
}

/// Argon2 is CPU bound, so hashing runs on the blocking pool.
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// `POST /v1/authentication/user`
///
/// Creates an inactive user with a pending invitation and mails the
/// activation link. If the mail cannot be sent the user is deleted again.
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let password_hash = hash_blocking(payload.password).await?;
    let plain_token = new_invitation_token();

    let user = state
        .users
        .create_and_invite(
            NewUser::new(payload.username, payload.email, password_hash),
            &hash_token(&plain_token),
            state.config.mail.invitation_lifetime,
        )
        .await?;

    let activation_url = format!("{}/confirm/{plain_token}", state.config.server.frontend_url);
    let vars = json!({
        "username": user.username,
        "activation_url": activation_url,
    });

    let sent = send_with_retry(
        state.mailer.as_ref(),
        USER_WELCOME_TEMPLATE,
        &user.username,
        &user.email,
        &vars,
        !state.config.is_production(),
        state.config.mail.retry_backoff,
    )
    .await;

    match sent {
        Ok(status) => tracing::info!(user_id = user.id, status, "welcome mail sent"),
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "error sending welcome mail");
            if let Err(e) = state.users.delete(user.id).await {
                tracing::error!(user_id = user.id, error = %e, "error deleting user");
            }
            return Err(e.into());
        }
    }

    let body = UserWithToken {
        user: UserContext::from(user),
        token: plain_token,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenPayload {
    pub email: String,
    pub password: String,
}

impl CreateTokenPayload {
    fn validate(&self) -> ApiResult<()> {
        check_email(&self.email)?;
        check_len("password", &self.password, 3, 72)
    }
}

/// `POST /v1/authentication/token`
///
/// Returns a signed token for an active user whose password matches.
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<CreateTokenPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = match state.users.get_by_email(&payload.email).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            tracing::warn!(email = %payload.email, "token requested for unknown user");
            return Err(ApiError::unauthorized());
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_blocking(payload.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = user.id, "token requested with wrong password");
        return Err(ApiError::unauthorized());
    }

    let claims = state.authenticator.claims_for(user.id);
    let token = state
        .authenticator
        .issue(&claims)
        .map_err(AuthError::from)?;

    tracing::info!(user_id = user.id, "token issued");
    Ok((StatusCode::CREATED, Json(token)))
}
