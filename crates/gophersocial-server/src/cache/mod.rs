//! Identity caching.
//!
//! ## Architecture
//!
//! - **Backend** ([`CacheStore`]): byte-level key/value store with TTL, either
//!   in-process ([`LocalCacheStore`], DashMap) or shared ([`RedisCacheStore`])
//! - **Identity cache** ([`UserCache`]): user snapshots keyed by id
//!
//! ```text
//! authentication middleware → UserCache → CacheStore
//!                                ↓ miss
//!                           UserStorage (durable store) → UserCache::set
//! ```
//!
//! Backend errors are returned to the caller; a failing cache is never
//! treated as a miss.

pub mod backend;
pub mod users;

pub use backend::{CacheError, CacheStore, LocalCacheStore, RedisCacheStore};
pub use users::{UserCache, UserCacheStats};
