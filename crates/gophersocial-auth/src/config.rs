//! Authentication, Basic auth and rate limiter configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.token]
//! secret = "change-me"
//! issuer = "gophersocial"
//! audience = "gophersocial"
//! lifetime = "3days"
//!
//! [auth.basic]
//! username = "admin"
//! password = "admin"
//!
//! [auth.rate_limiter]
//! enabled = true
//! requests_per_time_frame = 20
//! time_frame = "5s"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root auth configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub basic: BasicAuthConfig,
    pub rate_limiter: RateLimiterConfig,
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message naming the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.token.validate()?;
        self.rate_limiter.validate()?;
        Ok(())
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HMAC secret.
    pub secret: String,

    /// Value of the `iss` claim on issued tokens and the only accepted issuer.
    pub issuer: String,

    /// Value of the `aud` claim on issued tokens and the only accepted audience.
    pub audience: String,

    /// How long an issued token stays valid.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "example".to_string(),
            issuer: "gophersocial".to_string(),
            audience: "gophersocial".to_string(),
            lifetime: Duration::from_secs(3 * 24 * 3600),
        }
    }
}

impl TokenConfig {
    fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("auth.token.secret must not be empty".into());
        }
        if self.issuer.is_empty() || self.audience.is_empty() {
            return Err("auth.token.issuer and auth.token.audience must be set".into());
        }
        if self.lifetime.is_zero() {
            return Err("auth.token.lifetime must be greater than zero".into());
        }
        Ok(())
    }
}

/// Operator credentials for Basic-protected routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

/// Fixed-window rate limiter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// When disabled the limiter layer is bypassed entirely.
    pub enabled: bool,

    /// Admissions per key per window.
    pub requests_per_time_frame: u32,

    /// Window length.
    #[serde(with = "humantime_serde")]
    pub time_frame: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_time_frame: 20,
            time_frame: Duration::from_secs(5),
        }
    }
}

impl RateLimiterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.requests_per_time_frame == 0 {
            return Err("auth.rate_limiter.requests_per_time_frame must be at least 1".into());
        }
        if self.enabled && self.time_frame.is_zero() {
            return Err("auth.rate_limiter.time_frame must be greater than zero".into());
        }
        Ok(())
    }
}
