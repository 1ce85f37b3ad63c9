//! Records owned by the durable store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::StorageError;

// =============================================================================
// Role
// =============================================================================

/// A role with its precedence level.
///
/// Levels form a total order over role names; a higher level carries more
/// privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
    #[serde(default)]
    pub description: String,
}

impl Role {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, level: i32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Roles every fresh store starts with.
    #[must_use]
    pub fn defaults() -> Vec<Role> {
        vec![
            Role::new(1, "user", 1).with_description("A user can create posts and comments"),
            Role::new(2, "moderator", 2).with_description("A moderator can update other users posts"),
            Role::new(3, "admin", 3)
                .with_description("An admin can update and delete other users posts"),
        ]
    }
}

/// Name of the role assigned to users registered without an explicit role.
pub const DEFAULT_ROLE: &str = "user";

// =============================================================================
// User
// =============================================================================

/// An identity record.
///
/// The durable store owns this record; caches hold disposable snapshots of it.
/// `password_hash` is part of the snapshot, so never serialize a `User`
/// straight into an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_active: bool,
    pub role_id: i64,
    pub role: Role,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Role name; [`DEFAULT_ROLE`] when `None`.
    pub role: Option<String>,
    pub is_active: bool,
}

impl NewUser {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: None,
            is_active: false,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

/// A pending activation for a registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    /// Hex-encoded SHA-256 of the plain token mailed to the user.
    pub token_hash: String,
    pub user_id: i64,
    pub expiry: OffsetDateTime,
}

// =============================================================================
// Post
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
}

/// A feed entry: the post plus its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithMetadata {
    #[serde(flatten)]
    pub post: Post,
    pub username: String,
}

/// A post as returned on its own: with its comments, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

// =============================================================================
// Comment
// =============================================================================

/// The author fields embedded in a [`Comment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: CommentAuthor,
}

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

// =============================================================================
// Feed query
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(StorageError::invalid_query(format!(
                "sort must be one of asc, desc (got {other})"
            ))),
        }
    }
}

/// Pagination, filtering and sorting for a user feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub limit: usize,
    pub offset: usize,
    pub sort: SortOrder,
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort: SortOrder::Desc,
            tags: Vec::new(),
            search: None,
            since: None,
            until: None,
        }
    }
}

pub const MAX_FEED_LIMIT: usize = 20;
pub const MAX_FEED_TAGS: usize = 5;
pub const MAX_FEED_SEARCH_LEN: usize = 100;

impl FeedQuery {
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.limit == 0 || self.limit > MAX_FEED_LIMIT {
            return Err(StorageError::invalid_query(format!(
                "limit must be between 1 and {MAX_FEED_LIMIT}"
            )));
        }
        if self.tags.len() > MAX_FEED_TAGS {
            return Err(StorageError::invalid_query(format!(
                "at most {MAX_FEED_TAGS} tags are allowed"
            )));
        }
        if self
            .search
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_FEED_SEARCH_LEN)
        {
            return Err(StorageError::invalid_query(format!(
                "search must be at most {MAX_FEED_SEARCH_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Parses a `YYYY-MM-DD HH:MM:SS` timestamp, interpreted as UTC.
    pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, StorageError> {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        time::PrimitiveDateTime::parse(value, format)
            .map(|dt| dt.assume_utc())
            .map_err(|e| StorageError::invalid_query(format!("invalid timestamp '{value}': {e}")))
    }

    /// Returns `true` if the post passes every filter of this query.
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        if !self.tags.iter().all(|t| post.tags.contains(t)) {
            return false;
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.since.is_some_and(|since| post.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| post.created_at > until) {
            return false;
        }
        true
    }
}
