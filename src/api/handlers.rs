use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse {
        message: api.project_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        api_prefix: api.api_v1_str.clone(),
    })
}

/// Postgres is required; Redis only backs auth rate limiting, so losing it degrades.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = BTreeMap::new();

    let redis_ok = match state.redis().health().await {
        RedisHealth::Healthy => {
            components.insert("redis", "healthy".to_string());
            true
        }
        RedisHealth::Disconnected => {
            components.insert("redis", "disconnected".to_string());
            true
        }
        RedisHealth::Unhealthy(error) => {
            components.insert("redis", format!("unhealthy: {error}"));
            false
        }
    };

    let database_ok = match repositories::health::ping(state.db()).await {
        Ok(()) => {
            components.insert("database", "healthy".to_string());
            true
        }
        Err(err) => {
            components.insert("database", format!("unhealthy: {err}"));
            false
        }
    };

    let status = match (database_ok, redis_ok) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    Json(HealthResponse {
        service: "codelab-portal",
        status,
        executor_backend: state.lifecycle().executor_backend(),
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    metrics::render()
        .map(|body| ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
        .unwrap_or_else(|| StatusCode::SERVICE_UNAVAILABLE.into_response())
}
