//! HTTP middleware support for authentication and authorization.
//!
//! This module provides:
//!
//! - Bearer token parsing
//! - The typed request-scoped [`AuthContext`] and its [`CurrentUser`] extractor
//! - JSON error responses for [`crate::AuthError`]
//!
//! # Example
//!
//! ```ignore
//! use axum::{Json, Router, routing::get};
//! use gophersocial_auth::middleware::CurrentUser;
//!
//! async fn me(CurrentUser(auth): CurrentUser) -> Json<UserContext> {
//!     Json(auth.user_context())
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(from_fn_with_state(state, authentication_middleware));
//! ```

pub mod auth;
pub mod error;
pub mod types;

pub use auth::{CurrentUser, bearer_token};
pub use error::{BASIC_CHALLENGE, SERVER_ERROR_MESSAGE, status_code};
pub use types::{AuthContext, UserContext};
