use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use gophersocial_auth::{AuthError, CurrentUser, UserContext};

use crate::credentials::hash_token;
use crate::error::{ApiError, ApiResult};
use crate::middleware::resolve_user;
use crate::server::AppState;

fn user_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// `PUT /v1/users/activate/{token}`
pub async fn activate_user(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.activate(&hash_token(&token)).await?;
    tracing::info!("user activated");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/users/{id}`, served through the identity cache when enabled.
pub async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserContext>> {
    let id = user_id(path)?;
    match resolve_user(&state, id).await {
        Ok(user) => Ok(Json(UserContext::from(user))),
        Err(AuthError::UserNotFound { .. }) => Err(ApiError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// `PUT /v1/users/{id}/follow`: the caller follows `{id}`.
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = user_id(path)?;
    if id == auth.user_id() {
        return Err(ApiError::bad_request("users cannot follow themselves"));
    }
    state.followers.follow(id, auth.user_id()).await?;
    tracing::debug!(user_id = id, follower_id = auth.user_id(), "followed");
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /v1/users/{id}/unfollow`
pub async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = user_id(path)?;
    state.followers.unfollow(id, auth.user_id()).await?;
    tracing::debug!(user_id = id, follower_id = auth.user_id(), "unfollowed");
    Ok(StatusCode::NO_CONTENT)
}
