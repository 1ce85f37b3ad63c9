use gophersocial_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Token, Basic auth and rate limiter configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Identity cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redis connection, used when `cache.backend = "redis"`
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.request_timeout.is_zero() {
            return Err("server.request_timeout must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Cache validation
        if self.cache.enabled && self.cache.user_ttl.as_secs() == 0 {
            return Err("cache.user_ttl must be at least one second".into());
        }
        if self.cache.enabled
            && self.cache.backend == CacheBackendKind::Redis
            && self.redis.pool_size == 0
        {
            return Err("redis.pool_size must be > 0".into());
        }
        // Mail validation
        if self.mail.invitation_lifetime.is_zero() {
            return Err("mail.invitation_lifetime must be > 0".into());
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn is_production(&self) -> bool {
        self.server.env == "production"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deployment environment name; `production` turns off mail sandboxing.
    #[serde(default = "default_env")]
    pub env: String,
    /// Public address of the API, reported by the health endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Frontend base URL used in activation links.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_cors_allowed_origin")]
    pub cors_allowed_origin: String,
    /// Deadline for a whole request, and for identity resolution within it.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_env() -> String {
    "development".into()
}
fn default_api_url() -> String {
    "localhost:8080".into()
}
fn default_frontend_url() -> String {
    "http://localhost:5173".into()
}
fn default_cors_allowed_origin() -> String {
    "http://localhost:8080".into()
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            env: default_env(),
            api_url: default_api_url(),
            frontend_url: default_frontend_url(),
            cors_allowed_origin: default_cors_allowed_origin(),
            request_timeout: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where identity snapshots are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process DashMap, per instance.
    #[default]
    Local,
    /// Shared Redis, see [`RedisConfig`].
    Redis,
}

/// Identity cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When disabled, identity resolution reads the store directly.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Lifetime of a cached user snapshot.
    #[serde(default = "default_user_ttl", with = "humantime_serde")]
    pub user_ttl: Duration,
}

fn default_user_ttl() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CacheBackendKind::default(),
            user_ttl: default_user_ttl(),
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Outbound mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// How long an activation invitation stays valid.
    #[serde(default = "default_invitation_lifetime", with = "humantime_serde")]
    pub invitation_lifetime: Duration,

    /// Base pause between delivery attempts; attempt `n` waits `n` times this.
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

fn default_from_email() -> String {
    "hello@gophersocial.local".to_string()
}

fn default_invitation_lifetime() -> Duration {
    Duration::from_secs(3 * 24 * 3600)
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(1)
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: default_from_email(),
            invitation_lifetime: default_invitation_lifetime(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "gophersocial.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., GOPHERSOCIAL__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("GOPHERSOCIAL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
