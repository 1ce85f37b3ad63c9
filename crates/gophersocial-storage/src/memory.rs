//! In-memory storage backend.
//!
//! All tables live behind a single `tokio::sync::RwLock`, so multi-table
//! operations (`create_and_invite`, `activate`, `delete`) are atomic the way a
//! database transaction would make them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::traits::{CommentStorage, FollowerStorage, PostStorage, RoleStorage, UserStorage};
use crate::types::{
    Comment, CommentAuthor, DEFAULT_ROLE, FeedQuery, Invitation, NewComment, NewPost, NewUser,
    Post, PostWithMetadata, Role, SortOrder, User,
};
use crate::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: HashMap<String, Role>,
    invitations: HashMap<String, Invitation>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    /// (user_id, follower_id)
    followers: HashSet<(i64, i64)>,
    next_user_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn resolve_role(&self, name: Option<&str>) -> StorageResult<Role> {
        let name = name.unwrap_or(DEFAULT_ROLE);
        self.roles
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found("role", name))
    }

    fn insert_user(&mut self, new_user: NewUser) -> StorageResult<User> {
        if self.users.values().any(|u| u.email == new_user.email) {
            return Err(StorageError::DuplicateEmail);
        }
        if self.users.values().any(|u| u.username == new_user.username) {
            return Err(StorageError::DuplicateUsername);
        }
        let role = self.resolve_role(new_user.role.as_deref())?;

        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
            is_active: new_user.is_active,
            role_id: role.id,
            role,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn remove_invitations_for(&mut self, user_id: i64) {
        self.invitations.retain(|_, inv| inv.user_id != user_id);
    }
}

/// In-memory implementation of every storage trait.
#[derive(Debug)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    /// Creates a store seeded with [`Role::defaults`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_roles(Role::defaults())
    }

    /// Creates a store seeded with the given roles.
    #[must_use]
    pub fn with_roles(roles: Vec<Role>) -> Self {
        let tables = Tables {
            roles: roles.into_iter().map(|r| (r.name.clone(), r)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Number of stored users, active or not.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStorage for InMemoryStorage {
    async fn create(&self, user: NewUser) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.insert_user(user)?;
        tracing::debug!(user_id = user.id, role = %user.role.name, "user created");
        Ok(user)
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expiry: Duration,
    ) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.insert_user(user)?;
        tables.invitations.insert(
            token_hash.to_string(),
            Invitation {
                token_hash: token_hash.to_string(),
                user_id: user.id,
                expiry: OffsetDateTime::now_utc() + expiry,
            },
        );
        tracing::debug!(user_id = user.id, "user created with invitation");
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .filter(|u| u.is_active)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", id))
    }

    async fn get_by_email(&self, email: &str) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.email == email && u.is_active)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", email))
    }

    async fn activate(&self, token_hash: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let now = OffsetDateTime::now_utc();

        let user_id = tables
            .invitations
            .get(token_hash)
            .filter(|inv| inv.expiry > now)
            .map(|inv| inv.user_id)
            .ok_or_else(|| StorageError::not_found("invitation", token_hash))?;

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StorageError::not_found("user", user_id))?;
        user.is_active = true;

        tables.remove_invitations_for(user_id);
        tracing::debug!(user_id, "user activated");
        Ok(())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StorageError::not_found("user", id));
        }
        tables.remove_invitations_for(id);
        tables
            .followers
            .retain(|(user_id, follower_id)| *user_id != id && *follower_id != id);
        Ok(())
    }

    async fn set_role(&self, id: i64, role_name: &str) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        let role = tables.resolve_role(Some(role_name))?;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("user", id))?;
        user.role_id = role.id;
        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl RoleStorage for InMemoryStorage {
    async fn get_by_name(&self, name: &str) -> StorageResult<Role> {
        self.tables.read().await.resolve_role(Some(name))
    }
}

#[async_trait]
impl PostStorage for InMemoryStorage {
    async fn create(&self, post: NewPost) -> StorageResult<Post> {
        let mut tables = self.tables.write().await;
        tables.next_post_id += 1;
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: tables.next_post_id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            tags: post.tags,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_by_id(&self, id: i64) -> StorageResult<Post> {
        self.tables
            .read()
            .await
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("post", id))
    }

    async fn update(&self, post: &Post) -> StorageResult<Post> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StorageError::not_found("post", post.id))?;

        if stored.version != post.version {
            return Err(StorageError::version_conflict(post.version, stored.version));
        }

        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.tags = post.tags.clone();
        stored.version += 1;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Err(StorageError::not_found("post", id));
        }
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> StorageResult<Vec<PostWithMetadata>> {
        query.validate()?;
        let tables = self.tables.read().await;

        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| p.user_id == user_id || tables.followers.contains(&(p.user_id, user_id)))
            .filter(|p| query.matches(p))
            .collect();

        posts.sort_by_key(|p| (p.created_at, p.id));
        if query.sort == SortOrder::Desc {
            posts.reverse();
        }

        Ok(posts
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|p| PostWithMetadata {
                post: p.clone(),
                username: tables
                    .users
                    .get(&p.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl CommentStorage for InMemoryStorage {
    async fn create(&self, comment: NewComment) -> StorageResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StorageError::not_found("post", comment.post_id));
        }
        let username = tables
            .users
            .get(&comment.user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| StorageError::not_found("user", comment.user_id))?;

        tables.next_comment_id += 1;
        let comment = Comment {
            id: tables.next_comment_id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: OffsetDateTime::now_utc(),
            user: CommentAuthor {
                id: comment.user_id,
                username,
            },
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_by_post_id(&self, post_id: i64) -> StorageResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| std::cmp::Reverse((c.created_at, c.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowerStorage for InMemoryStorage {
    async fn follow(&self, user_id: i64, follower_id: i64) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StorageError::not_found("user", user_id));
        }
        if !tables.followers.insert((user_id, follower_id)) {
            return Err(StorageError::already_exists(
                "follower",
                format!("{follower_id}->{user_id}"),
            ));
        }
        Ok(())
    }

    async fn unfollow(&self, user_id: i64, follower_id: i64) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .followers
            .remove(&(user_id, follower_id));
        Ok(())
    }
}
