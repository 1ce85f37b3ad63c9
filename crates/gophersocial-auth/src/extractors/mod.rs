//! Axum extractors for authentication.

pub mod basic_auth;

pub use basic_auth::{BasicAuth, BasicAuthState};
