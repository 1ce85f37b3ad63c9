use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use gophersocial_auth::BasicAuth;
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    env: String,
    version: &'static str,
}

pub async fn health(State(state): State<AppState>, _operator: BasicAuth) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok",
        env: state.config.server.env.clone(),
        version: env!("CARGO_PKG_VERSION"),
    };
    (StatusCode::OK, Json(body))
}

/// Runtime counters for operators.
pub async fn debug_vars(State(state): State<AppState>, operator: BasicAuth) -> impl IntoResponse {
    tracing::debug!(operator = %operator.username, "debug vars requested");

    let cache = state.user_cache.as_ref().map(|cache| {
        let stats = cache.stats();
        json!({
            "backend": cache.backend(),
            "hits": stats.hits,
            "misses": stats.misses,
        })
    });

    let body = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "env": state.config.server.env,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "rate_limiter": {
            "enabled": state.config.auth.rate_limiter.enabled,
            "tracked_keys": state.limiter.tracked_keys(),
        },
        "identity_cache": cache,
    });
    (StatusCode::OK, Json(body))
}
