use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use gophersocial_auth::CurrentUser;
use gophersocial_storage::{NewPost, Post, PostWithComments};
use serde::Deserialize;

use super::check_len;
use crate::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostPayload {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatePostPayload {
    fn validate(&self) -> ApiResult<()> {
        check_len("title", &self.title, 1, 100)?;
        check_len("content", &self.content, 1, 1000)
    }
}

/// `POST /v1/posts`: the post is owned by the caller.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    payload: Result<Json<CreatePostPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let post = state
        .posts
        .create(NewPost {
            title: payload.title,
            content: payload.content,
            user_id: auth.user_id(),
            tags: payload.tags,
        })
        .await?;

    tracing::debug!(post_id = post.id, user_id = post.user_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /v1/posts/{id}`: the post loaded by the post context layer, with
/// its comments.
pub async fn get_post(
    State(state): State<AppState>,
    Extension(post): Extension<Post>,
) -> ApiResult<Json<PostWithComments>> {
    let comments = state.comments.get_by_post_id(post.id).await?;
    Ok(Json(PostWithComments { post, comments }))
}

/// Partial update: absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdatePostPayload {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdatePostPayload {
    fn validate(&self) -> ApiResult<()> {
        if let Some(title) = &self.title {
            check_len("title", title, 0, 1000)?;
        }
        if let Some(content) = &self.content {
            check_len("content", content, 0, 1000)?;
        }
        Ok(())
    }
}

/// `PATCH /v1/posts/{id}`
///
/// Fails with 409 when another writer bumped the version after the post was
/// loaded.
pub async fn update_post(
    State(state): State<AppState>,
    Extension(mut post): Extension<Post>,
    payload: Result<Json<UpdatePostPayload>, JsonRejection>,
) -> ApiResult<Json<Post>> {
    let Json(payload) = payload?;
    payload.validate()?;

    if let Some(title) = payload.title {
        post.title = title;
    }
    if let Some(content) = payload.content {
        post.content = content;
    }

    let updated = state.posts.update(&post).await?;
    tracing::debug!(post_id = updated.id, version = updated.version, "post updated");
    Ok(Json(updated))
}

/// `DELETE /v1/posts/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(post): Extension<Post>,
) -> ApiResult<StatusCode> {
    state.posts.delete(post.id).await?;
    tracing::info!(post_id = post.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
