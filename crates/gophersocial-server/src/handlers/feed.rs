use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use gophersocial_auth::CurrentUser;
use gophersocial_storage::{FeedQuery, PostWithMetadata};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Raw feed query string.
///
/// `tags` is comma separated; `since` and `until` use `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl FeedParams {
    /// Applies the parameters over the default query and validates the result.
    pub fn into_query(self) -> ApiResult<FeedQuery> {
        let mut query = FeedQuery::default();

        if let Some(limit) = self.limit {
            query.limit = limit;
        }
        if let Some(offset) = self.offset {
            query.offset = offset;
        }
        if let Some(sort) = self.sort.filter(|s| !s.is_empty()) {
            query.sort = sort.parse()?;
        }
        if let Some(tags) = self.tags.filter(|t| !t.is_empty()) {
            query.tags = tags.split(',').map(|t| t.trim().to_string()).collect();
        }
        query.search = self.search.filter(|s| !s.is_empty());
        if let Some(since) = self.since.filter(|s| !s.is_empty()) {
            query.since = Some(FeedQuery::parse_timestamp(&since)?);
        }
        if let Some(until) = self.until.filter(|s| !s.is_empty()) {
            query.until = Some(FeedQuery::parse_timestamp(&until)?);
        }

        query.validate()?;
        Ok(query)
    }
}

/// `GET /v1/users/feed`: the caller's posts and those of users they follow.
pub async fn get_user_feed(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> ApiResult<Json<Vec<PostWithMetadata>>> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = params.into_query()?;

    let feed = state.posts.get_user_feed(auth.user_id(), &query).await?;
    tracing::debug!(user_id = auth.user_id(), entries = feed.len(), "feed served");
    Ok(Json(feed))
}
