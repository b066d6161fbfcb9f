//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status ("ok" even when the inference endpoint is down;
    /// the store keeps working and enrichment degrades to fallback)
    pub status: String,
    /// Module name ("pulse-ai")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether the inference endpoint answered a model listing
    pub ollama: bool,
}

/// GET /health
///
/// Health check endpoint for monitoring. Probes the inference endpoint
/// on every call; the probe has its own short timeout.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let ollama = state.classifier.client().is_available().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "pulse-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        ollama,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
