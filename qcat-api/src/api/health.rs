//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when the database answers, "degraded" otherwise
    pub status: String,
    pub module: String,
    pub version: String,
    /// Source revision the binary was built from
    pub git_hash: String,
    pub build_timestamp: String,
    pub uptime_seconds: u64,
    /// Applied schema version, absent when the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let schema_version = qcat_common::db::migrations::get_schema_version(&state.db)
        .await
        .ok();

    Json(HealthResponse {
        status: if schema_version.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "qcat-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        uptime_seconds,
        schema_version,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
