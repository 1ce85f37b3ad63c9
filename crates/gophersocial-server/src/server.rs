use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};
use gophersocial_auth::{
    BasicAuthState, FixedWindowLimiter, JwtAuthenticator, Limiter, RolePrecedence,
};
use gophersocial_storage::{
    CommentStorage, FollowerStorage, InMemoryStorage, PostStorage, RoleStorage, UserStorage,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::UserCache;
use crate::config::AppConfig;
use crate::mailer::{LoggingMailer, Mailer};
use crate::middleware::{
    OwnershipGuard, RequestId, authentication_middleware, check_post_ownership,
    post_context_middleware, rate_limit_middleware, request_id,
};
use crate::{create_cache_store, handlers};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStorage>,
    pub roles: Arc<dyn RoleStorage>,
    pub posts: Arc<dyn PostStorage>,
    pub comments: Arc<dyn CommentStorage>,
    pub followers: Arc<dyn FollowerStorage>,
    pub authenticator: Arc<JwtAuthenticator>,
    pub limiter: Arc<dyn Limiter>,
    /// `None` when `cache.enabled` is off.
    pub user_cache: Option<UserCache>,
    pub precedence: RolePrecedence,
    pub mailer: Arc<dyn Mailer>,
    pub basic: BasicAuthState,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the state from a single backend implementing every storage
    /// trait. Spawns the rate limiter's expiry task, so call it inside a
    /// Tokio runtime.
    pub fn new<S>(
        config: AppConfig,
        storage: Arc<S>,
        mailer: Arc<dyn Mailer>,
        user_cache: Option<UserCache>,
    ) -> Self
    where
        S: UserStorage + RoleStorage + PostStorage + CommentStorage + FollowerStorage + 'static,
    {
        let users: Arc<dyn UserStorage> = storage.clone();
        let roles: Arc<dyn RoleStorage> = storage.clone();
        let posts: Arc<dyn PostStorage> = storage.clone();
        let comments: Arc<dyn CommentStorage> = storage.clone();
        let followers: Arc<dyn FollowerStorage> = storage;

        let limits = &config.auth.rate_limiter;
        let limiter: Arc<dyn Limiter> = Arc::new(FixedWindowLimiter::new(
            limits.requests_per_time_frame,
            limits.time_frame,
        ));

        Self {
            authenticator: Arc::new(JwtAuthenticator::from_config(&config.auth.token)),
            basic: BasicAuthState::new(config.auth.basic.clone()),
            precedence: RolePrecedence::new(roles.clone()),
            config: Arc::new(config),
            users,
            roles,
            posts,
            comments,
            followers,
            limiter,
            user_cache,
            mailer,
            started_at: Instant::now(),
        }
    }
}

impl FromRef<AppState> for BasicAuthState {
    fn from_ref(state: &AppState) -> Self {
        state.basic.clone()
    }
}

pub struct GopherSocialServer {
    addr: SocketAddr,
    app: Router,
}

fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let origin = match cfg.server.cors_allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(
                origin = %cfg.server.cors_allowed_origin,
                error = %e,
                "invalid CORS origin, cross-origin requests disabled"
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(false)
        .max_age(std::time::Duration::from_secs(300))
}

pub fn build_app(state: AppState) -> Router {
    let cfg = Arc::clone(&state.config);
    let authenticate = from_fn_with_state(state.clone(), authentication_middleware);

    let ops = Router::new()
        .route("/v1/health", get(handlers::health::health))
        .route("/v1/debug/vars", get(handlers::health::debug_vars));

    let public = Router::new()
        .route("/v1/authentication/user", post(handlers::auth::register_user))
        .route("/v1/authentication/token", post(handlers::auth::create_token))
        .route("/v1/users/activate/{token}", put(handlers::users::activate_user));

    // Owners may always edit; others need at least the guard's role.
    let moderate = OwnershipGuard::new(state.precedence.clone(), "moderator");
    let administer = OwnershipGuard::new(state.precedence.clone(), "admin");

    let protected = Router::new()
        .route("/v1/posts", post(handlers::posts::create_post))
        .route(
            "/v1/posts/{id}",
            get(handlers::posts::get_post)
                .merge(
                    patch(handlers::posts::update_post)
                        .route_layer(from_fn_with_state(moderate, check_post_ownership)),
                )
                .merge(
                    delete(handlers::posts::delete_post)
                        .route_layer(from_fn_with_state(administer, check_post_ownership)),
                )
                .route_layer(from_fn_with_state(state.clone(), post_context_middleware)),
        )
        .route("/v1/users/feed", get(handlers::feed::get_user_feed))
        .route("/v1/users/{id}", get(handlers::users::get_user))
        .route("/v1/users/{id}/follow", put(handlers::users::follow_user))
        .route("/v1/users/{id}/unfollow", put(handlers::users::unfollow_user))
        .route_layer(authenticate);

    Router::new()
        .merge(ops)
        .merge(public)
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            cfg.server.request_timeout,
        ))
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&cfg))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|RequestId(v)| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("http.status_code", res.status().as_u16());
                        tracing::info!(
                            http.status = res.status().as_u16(),
                            elapsed_ms = latency.as_millis() as u64,
                            "request handled"
                        );
                    },
                ),
        )
        .layer(from_fn(request_id))
        .with_state(state)
}

#[derive(Default)]
pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    config: AppConfig,
    storage: Option<Arc<InMemoryStorage>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_storage(mut self, storage: Arc<InMemoryStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Connects the identity cache backend and assembles the router.
    pub async fn build(self) -> anyhow::Result<GopherSocialServer> {
        let cfg = self.config;
        let addr = self.addr.unwrap_or_else(|| cfg.addr());

        let user_cache = if cfg.cache.enabled {
            let store = create_cache_store(&cfg).await?;
            tracing::info!(
                backend = store.name(),
                ttl = ?cfg.cache.user_ttl,
                "identity cache enabled"
            );
            Some(UserCache::new(store, cfg.cache.user_ttl))
        } else {
            tracing::info!("identity cache disabled");
            None
        };

        let storage = self.storage.unwrap_or_default();
        let mailer = self
            .mailer
            .unwrap_or_else(|| Arc::new(LoggingMailer::new(cfg.mail.from_email.clone())));

        let state = AppState::new(cfg, storage, mailer, user_cache);
        Ok(GopherSocialServer {
            addr,
            app: build_app(state),
        })
    }
}

impl GopherSocialServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "listening");
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        let cfg = AppConfig::default();
        let mailer = Arc::new(LoggingMailer::new(cfg.mail.from_email.clone()));
        build_app(AppState::new(
            cfg,
            Arc::new(InMemoryStorage::new()),
            mailer,
            None,
        ))
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let resp = app()
            .oneshot(Request::get("/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let resp = app()
            .oneshot(
                Request::options("/v1/posts")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:8080"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let resp = app()
            .oneshot(
                Request::get("/v1/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_builder_uses_config_address() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 9191;
        let server = ServerBuilder::new().with_config(cfg).build().await.unwrap();
        assert_eq!(server.addr.port(), 9191);
    }
}
