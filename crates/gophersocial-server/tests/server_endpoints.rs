use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gophersocial_auth::JwtAuthenticator;
use gophersocial_auth::middleware::SERVER_ERROR_MESSAGE;
use gophersocial_server::credentials::hash_password;
use gophersocial_server::mailer::MailError;
use gophersocial_server::{
    AppConfig, AppState, CacheError, CacheStore, LocalCacheStore, LoggingMailer, Mailer, UserCache,
    build_app,
};
use gophersocial_storage::{
    CommentStorage, InMemoryStorage, NewComment, NewUser, User, UserStorage,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    storage: Arc<InMemoryStorage>,
    authenticator: JwtAuthenticator,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn token_for(&self, user: &User) -> String {
        self.authenticator
            .issue(&self.authenticator.claims_for(user.id))
            .unwrap()
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

async fn start_server_with(
    cfg: AppConfig,
    mailer: Arc<dyn Mailer>,
    user_cache: Option<UserCache>,
) -> TestServer {
    let storage = Arc::new(InMemoryStorage::new());
    let authenticator = JwtAuthenticator::from_config(&cfg.auth.token);
    let app = build_app(AppState::new(cfg, storage.clone(), mailer, user_cache));

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.await;
        })
        .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        storage,
        authenticator,
        shutdown: tx,
        handle,
    }
}

async fn start_server() -> TestServer {
    start_server_with(
        AppConfig::default(),
        Arc::new(LoggingMailer::new("test@gophersocial.local")),
        None,
    )
    .await
}

async fn active_user(storage: &InMemoryStorage, name: &str, role: &str) -> User {
    let hash = hash_password("password123").unwrap();
    UserStorage::create(
        storage,
        NewUser::new(name, format!("{name}@example.com"), hash)
            .with_role(role)
            .active(),
    )
    .await
    .unwrap()
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _template: &str,
        _username: &str,
        _email: &str,
        _vars: &Value,
        _sandbox: bool,
    ) -> Result<u16, MailError> {
        Err(MailError::Delivery("provider unavailable".into()))
    }
}

/// Cache whose reads never finish in time.
struct SlowCacheStore;

#[async_trait]
impl CacheStore for SlowCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

struct BrokenCacheStore;

#[async_trait]
impl CacheStore for BrokenCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

async fn start_cached_server(cfg: AppConfig, store: Arc<dyn CacheStore>) -> TestServer {
    let cache = UserCache::new(store, cfg.cache.user_ttl);
    start_server_with(
        cfg,
        Arc::new(LoggingMailer::new("test@gophersocial.local")),
        Some(cache),
    )
    .await
}

#[tokio::test]
async fn missing_or_bad_bearer_is_unauthorized() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/v1/posts/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(
        resp.headers()["www-authenticate"]
            .to_str()
            .unwrap()
            .starts_with("Bearer")
    );
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("unauthorized"));

    let resp = client
        .get(server.url("/v1/users/feed"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A valid token whose subject no longer exists
    let gone = active_user(&server.storage, "ghost", "user").await;
    let token = server.token_for(&gone);
    UserStorage::delete(server.storage.as_ref(), gone.id)
        .await
        .unwrap();
    let resp = client
        .get(server.url("/v1/users/feed"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn post_ownership_and_role_precedence() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let owner = active_user(&server.storage, "owner", "user").await;
    let other = active_user(&server.storage, "other", "user").await;
    let moderator = active_user(&server.storage, "mod", "moderator").await;
    let admin = active_user(&server.storage, "root", "admin").await;

    let resp = client
        .post(server.url("/v1/posts"))
        .bearer_auth(server.token_for(&owner))
        .json(&json!({ "title": "hello", "content": "first post", "tags": ["intro"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = resp.json().await.unwrap();
    assert_eq!(post["user_id"], owner.id);
    let post_url = server.url(&format!("/v1/posts/{}", post["id"]));

    // Another plain user may read but not edit
    let resp = client
        .get(&post_url)
        .bearer_auth(server.token_for(&other))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["comments"], json!([]));

    let resp = client
        .patch(&post_url)
        .bearer_auth(server.token_for(&other))
        .json(&json!({ "title": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The owner can
    let resp = client
        .patch(&post_url)
        .bearer_auth(server.token_for(&owner))
        .json(&json!({ "title": "hello again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "hello again");
    assert_eq!(updated["content"], "first post");
    assert_eq!(updated["version"], 1);

    // Moderators may edit but not delete
    let resp = client
        .patch(&post_url)
        .bearer_auth(server.token_for(&moderator))
        .json(&json!({ "content": "moderated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .delete(&post_url)
        .bearer_auth(server.token_for(&moderator))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .delete(&post_url)
        .bearer_auth(server.token_for(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(&post_url)
        .bearer_auth(server.token_for(&owner))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn rate_limiter_rejects_after_limit() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    for i in 0..20 {
        let resp = client
            .get(server.url("/v1/health"))
            .basic_auth("admin", Some("admin"))
            .header("x-forwarded-for", "203.0.113.9")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "request {i} should be admitted");
    }

    let resp = client
        .get(server.url("/v1/health"))
        .basic_auth("admin", Some("admin"))
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["retry-after"], "5");
    let body: Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("rate limit exceeded")
    );

    // Other clients are unaffected
    let resp = client
        .get(server.url("/v1/health"))
        .basic_auth("admin", Some("admin"))
        .header("x-forwarded-for", "198.51.100.4")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn rate_limiter_can_be_disabled() {
    let mut cfg = AppConfig::default();
    cfg.auth.rate_limiter.enabled = false;
    cfg.auth.rate_limiter.requests_per_time_frame = 1;
    let server = start_server_with(
        cfg,
        Arc::new(LoggingMailer::new("test@gophersocial.local")),
        None,
    )
    .await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .get(server.url("/v1/health"))
            .basic_auth("admin", Some("admin"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    server.stop().await;
}

#[tokio::test]
async fn operator_routes_require_basic_auth() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/v1/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()["www-authenticate"],
        r#"Basic realm="restricted", charset="UTF-8""#
    );

    let resp = client
        .get(server.url("/v1/health"))
        .basic_auth("admin", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(server.url("/v1/health"))
        .basic_auth("admin", Some("admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "development");

    let resp = client
        .get(server.url("/v1/debug/vars"))
        .basic_auth("admin", Some("admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(body["rate_limiter"]["tracked_keys"].as_u64().unwrap() >= 1);
    assert!(body["identity_cache"].is_null());

    server.stop().await;
}

#[tokio::test]
async fn register_activate_and_issue_token() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/v1/authentication/user"))
        .json(&json!({
            "username": "gopher",
            "email": "gopher@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let registered: Value = resp.json().await.unwrap();
    assert_eq!(registered["username"], "gopher");
    assert_eq!(registered["is_active"], false);
    assert_eq!(registered["role"]["name"], "user");
    assert!(registered.get("password_hash").is_none());
    let invitation = registered["token"].as_str().unwrap().to_string();

    let credentials = json!({ "email": "gopher@example.com", "password": "hunter22" });

    // Inactive users cannot log in
    let resp = client
        .post(server.url("/v1/authentication/token"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Duplicate email is a bad request
    let resp = client
        .post(server.url("/v1/authentication/user"))
        .json(&json!({
            "username": "gopher2",
            "email": "gopher@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .put(server.url(&format!("/v1/users/activate/{invitation}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Invitations are single use
    let resp = client
        .put(server.url(&format!("/v1/users/activate/{invitation}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(server.url("/v1/authentication/token"))
        .json(&json!({ "email": "gopher@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(server.url("/v1/authentication/token"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let token: String = resp.json().await.unwrap();

    let id = registered["id"].as_i64().unwrap();
    let resp = client
        .get(server.url(&format!("/v1/users/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["email"], "gopher@example.com");
    assert_eq!(profile["is_active"], true);

    server.stop().await;
}

#[tokio::test]
async fn registration_is_rolled_back_when_mail_fails() {
    let mut cfg = AppConfig::default();
    cfg.mail.retry_backoff = Duration::from_millis(5);
    let server = start_server_with(cfg, Arc::new(FailingMailer), None).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/v1/authentication/user"))
        .json(&json!({
            "username": "unlucky",
            "email": "unlucky@example.com",
            "password": "hunter22"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], SERVER_ERROR_MESSAGE);
    assert_eq!(server.storage.user_count().await, 0);

    server.stop().await;
}

#[tokio::test]
async fn registration_payload_is_validated() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/v1/authentication/user"))
        .json(&json!({ "username": "gopher", "email": "not-an-email", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(server.url("/v1/authentication/user"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn follow_and_feed() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let author = active_user(&server.storage, "author", "user").await;
    let reader = active_user(&server.storage, "reader", "user").await;
    let reader_token = server.token_for(&reader);

    let resp = client
        .post(server.url("/v1/posts"))
        .bearer_auth(server.token_for(&author))
        .json(&json!({ "title": "gophers", "content": "they dig", "tags": ["go"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let feed_url = server.url("/v1/users/feed");
    let feed: Vec<Value> = client
        .get(&feed_url)
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.is_empty());

    let follow_url = server.url(&format!("/v1/users/{}/follow", author.id));
    let resp = client
        .put(&follow_url)
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .put(&follow_url)
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let feed: Vec<Value> = client
        .get(format!("{feed_url}?tags=go&sort=asc"))
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["username"], "author");
    assert_eq!(feed[0]["title"], "gophers");

    let resp = client
        .get(format!("{feed_url}?limit=100"))
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .put(server.url(&format!("/v1/users/{}/unfollow", author.id)))
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let feed: Vec<Value> = client
        .get(&feed_url)
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.is_empty());

    let resp = client
        .put(server.url("/v1/users/9999/follow"))
        .bearer_auth(&reader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn identity_cache_serves_repeat_lookups() {
    let mut cfg = AppConfig::default();
    cfg.cache.enabled = true;
    let cache = UserCache::new(Arc::new(LocalCacheStore::new()), cfg.cache.user_ttl);
    let server = start_server_with(
        cfg,
        Arc::new(LoggingMailer::new("test@gophersocial.local")),
        Some(cache.clone()),
    )
    .await;
    let client = reqwest::Client::new();

    let user = active_user(&server.storage, "cached", "user").await;
    let token = server.token_for(&user);

    for _ in 0..3 {
        let resp = client
            .get(server.url(&format!("/v1/users/{}", user.id)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // One miss fills the cache; every later lookup of the same id is a hit.
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 5);

    let resp = client
        .get(server.url("/v1/users/4242"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .get(server.url("/v1/debug/vars"))
        .basic_auth("admin", Some("admin"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["identity_cache"]["backend"], "local");

    server.stop().await;
}

#[tokio::test]
async fn fetched_post_embeds_comments() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let author = active_user(&server.storage, "author", "user").await;
    let reader = active_user(&server.storage, "reader", "user").await;

    let resp = client
        .post(server.url("/v1/posts"))
        .bearer_auth(server.token_for(&author))
        .json(&json!({ "title": "gophers", "content": "they dig" }))
        .send()
        .await
        .unwrap();
    let post: Value = resp.json().await.unwrap();
    let post_id = post["id"].as_i64().unwrap();

    for (user, content) in [(&reader, "nice"), (&author, "thanks")] {
        CommentStorage::create(
            server.storage.as_ref(),
            NewComment {
                post_id,
                user_id: user.id,
                content: content.to_string(),
            },
        )
        .await
        .unwrap();
    }

    let resp = client
        .get(server.url(&format!("/v1/posts/{post_id}")))
        .bearer_auth(server.token_for(&reader))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "gophers");

    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "thanks");
    assert_eq!(comments[0]["user"]["username"], "author");
    assert_eq!(comments[1]["user"]["username"], "reader");

    server.stop().await;
}

#[tokio::test]
async fn slow_identity_lookup_is_a_server_error() {
    let mut cfg = AppConfig::default();
    cfg.cache.enabled = true;
    cfg.server.request_timeout = Duration::from_millis(200);
    let server = start_cached_server(cfg, Arc::new(SlowCacheStore)).await;
    let client = reqwest::Client::new();

    let user = active_user(&server.storage, "patient", "user").await;
    let resp = client
        .get(server.url(&format!("/v1/users/{}", user.id)))
        .bearer_auth(server.token_for(&user))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    server.stop().await;
}

#[tokio::test]
async fn failing_identity_cache_is_not_a_miss() {
    let mut cfg = AppConfig::default();
    cfg.cache.enabled = true;
    let server = start_cached_server(cfg, Arc::new(BrokenCacheStore)).await;
    let client = reqwest::Client::new();

    // The user exists in the store, so falling back to it would succeed.
    let user = active_user(&server.storage, "unlucky", "user").await;
    let resp = client
        .get(server.url(&format!("/v1/users/{}", user.id)))
        .bearer_auth(server.token_for(&user))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], SERVER_ERROR_MESSAGE);

    server.stop().await;
}

#[tokio::test]
async fn role_change_applies_after_cache_ttl() {
    let mut cfg = AppConfig::default();
    cfg.cache.enabled = true;
    cfg.cache.user_ttl = Duration::from_secs(1);
    let server = start_cached_server(cfg, Arc::new(LocalCacheStore::new())).await;
    let client = reqwest::Client::new();

    let owner = active_user(&server.storage, "owner", "user").await;
    let staff = active_user(&server.storage, "staff", "user").await;
    let staff_token = server.token_for(&staff);

    let resp = client
        .post(server.url("/v1/posts"))
        .bearer_auth(server.token_for(&owner))
        .json(&json!({ "title": "hello", "content": "first post" }))
        .send()
        .await
        .unwrap();
    let post: Value = resp.json().await.unwrap();
    let post_url = server.url(&format!("/v1/posts/{}", post["id"]));

    let resp = client
        .delete(&post_url)
        .bearer_auth(&staff_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    server.storage.set_role(staff.id, "admin").await.unwrap();

    // The cached identity still carries the old role.
    let resp = client
        .delete(&post_url)
        .bearer_auth(&staff_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let resp = client
        .delete(&post_url)
        .bearer_auth(&staff_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    server.stop().await;
}
