//! # gophersocial-storage
//!
//! Durable store abstraction for the GopherSocial server.
//!
//! This crate defines the records the server persists (users, roles, posts,
//! invitations, comments, follower edges), the traits every backend implements, and an
//! in-memory backend used for development and tests.
//!
//! ## Example
//!
//! ```ignore
//! use gophersocial_storage::{InMemoryStorage, NewUser, UserStorage};
//!
//! let storage = InMemoryStorage::new();
//! let user = UserStorage::create(
//!     &storage,
//!     NewUser::new("gopher", "gopher@example.com", hash).active(),
//! )
//! .await?;
//! let same = UserStorage::get_by_id(&storage, user.id).await?;
//! ```

mod error;
pub mod memory;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryStorage;
pub use traits::{CommentStorage, FollowerStorage, PostStorage, RoleStorage, UserStorage};
pub use types::{
    Comment, CommentAuthor, DEFAULT_ROLE, FeedQuery, Invitation, MAX_FEED_LIMIT,
    MAX_FEED_SEARCH_LEN, MAX_FEED_TAGS, NewComment, NewPost, NewUser, Post, PostWithComments,
    PostWithMetadata, Role, SortOrder, User,
};

/// Type alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;
