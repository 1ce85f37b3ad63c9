//! # gophersocial-auth
//!
//! Request admission and authorization building blocks for the GopherSocial
//! server.
//!
//! This crate provides:
//! - HS256 token issuing and verification with fixed, typed claims
//! - A fixed-window rate limiter with a single expiry task
//! - Role precedence authorization with an ownership short-circuit
//! - HTTP Basic credential extraction for operator routes
//! - The auth error taxonomy and its HTTP mapping
//!
//! ## Modules
//!
//! - [`config`] - Token, Basic auth and rate limiter configuration
//! - [`token`] - Token claims, issuing and verification
//! - [`rate_limit`] - Per-key admission gate
//! - [`policy`] - Role precedence checks
//! - [`middleware`] - Request-scoped auth context and error responses
//! - [`extractors`] - Axum extractors (Basic auth)

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod policy;
pub mod rate_limit;
pub mod token;

pub use config::{AuthConfig, BasicAuthConfig, RateLimiterConfig, TokenConfig};
pub use error::{AuthError, ErrorCategory};
pub use extractors::{BasicAuth, BasicAuthState};
pub use middleware::{AuthContext, CurrentUser, UserContext};
pub use policy::RolePrecedence;
pub use rate_limit::{Decision, FixedWindowLimiter, Limiter};
pub use token::{Claims, JwtAuthenticator, JwtError};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
