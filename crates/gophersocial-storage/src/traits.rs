//! Storage traits for the durable store.
//!
//! These traits are the only contract the request pipeline and handlers have
//! with persistence. Backends implement them; [`crate::memory::InMemoryStorage`]
//! is the bundled one.

use std::time::Duration;

use async_trait::async_trait;

use crate::StorageResult;
use crate::types::{
    Comment, FeedQuery, NewComment, NewPost, NewUser, Post, PostWithMetadata, Role, User,
};

/// Identity records.
///
/// # Example
///
/// ```ignore
/// async fn lookup(storage: &dyn UserStorage) -> StorageResult<User> {
///     storage.get_by_id(42).await
/// }
/// ```
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Creates a user and returns the stored record (with id and role resolved).
    ///
    /// # Errors
    ///
    /// `DuplicateEmail` / `DuplicateUsername` on uniqueness violations,
    /// `NotFound` if the requested role does not exist.
    async fn create(&self, user: NewUser) -> StorageResult<User>;

    /// Creates an inactive user together with an activation invitation.
    ///
    /// `token_hash` is the hashed invitation token; the invitation expires
    /// after `expiry`.
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expiry: Duration,
    ) -> StorageResult<User>;

    /// Looks up an active user by id. Inactive users are `NotFound`.
    async fn get_by_id(&self, id: i64) -> StorageResult<User>;

    /// Looks up an active user by email. Inactive users are `NotFound`.
    async fn get_by_email(&self, email: &str) -> StorageResult<User>;

    /// Activates the user owning an unexpired invitation and removes the
    /// user's invitations.
    async fn activate(&self, token_hash: &str) -> StorageResult<()>;

    /// Deletes a user and any pending invitations.
    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Changes a user's role. Cached identities keep the old role until their
    /// TTL runs out.
    async fn set_role(&self, id: i64, role_name: &str) -> StorageResult<User>;
}

/// Role lookups.
#[async_trait]
pub trait RoleStorage: Send + Sync {
    /// Finds a role by its name.
    async fn get_by_name(&self, name: &str) -> StorageResult<Role>;
}

/// Posts and feeds.
#[async_trait]
pub trait PostStorage: Send + Sync {
    async fn create(&self, post: NewPost) -> StorageResult<Post>;

    async fn get_by_id(&self, id: i64) -> StorageResult<Post>;

    /// Stores `post` if its `version` matches the stored one and returns the
    /// record with the version bumped.
    ///
    /// # Errors
    ///
    /// `VersionConflict` if another writer updated the post first.
    async fn update(&self, post: &Post) -> StorageResult<Post>;

    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Posts by `user_id` and by the users it follows, filtered and paginated.
    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> StorageResult<Vec<PostWithMetadata>>;
}

/// Comments on posts.
#[async_trait]
pub trait CommentStorage: Send + Sync {
    /// Stores a comment by `user_id` on `post_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the post or the author does not exist.
    async fn create(&self, comment: NewComment) -> StorageResult<Comment>;

    /// Comments on a post, newest first. An unknown post has none.
    async fn get_by_post_id(&self, post_id: i64) -> StorageResult<Vec<Comment>>;
}

/// Follower relations.
#[async_trait]
pub trait FollowerStorage: Send + Sync {
    /// Records that `follower_id` follows `user_id`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the relation is already recorded.
    async fn follow(&self, user_id: i64, follower_id: i64) -> StorageResult<()>;

    async fn unfollow(&self, user_id: i64, follower_id: i64) -> StorageResult<()>;
}
