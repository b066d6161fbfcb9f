//! pulse-ai library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use pulse_common::events::EventBus;

use crate::config::AiSettings;
use crate::services::{CommentClassifier, EnrichmentOrchestrator, OllamaClient, ProgressTracker};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Progress tracker shared between the orchestrator and the status
    /// endpoint
    pub tracker: Arc<ProgressTracker>,
    /// Classifier backing the ad-hoc analysis endpoints
    pub classifier: Arc<CommentClassifier>,
    /// Background enrichment coordinator
    pub orchestrator: Arc<EnrichmentOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        settings: &AiSettings,
    ) -> Result<Self, crate::services::ClassifierError> {
        let client = OllamaClient::new(
            &settings.ollama_base_url,
            &settings.ollama_model,
            settings.request_timeout_ms,
        )?;
        let classifier = Arc::new(CommentClassifier::new(client));
        let tracker = Arc::new(ProgressTracker::new());
        let orchestrator = Arc::new(EnrichmentOrchestrator::new(
            db.clone(),
            event_bus.clone(),
            Arc::clone(&tracker),
            Arc::clone(&classifier),
            settings.worker_count,
            settings.throttle_ms,
            settings.db_max_lock_wait_ms,
        ));

        Ok(Self {
            db,
            event_bus,
            tracker,
            classifier,
            orchestrator,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;

    Router::new()
        .merge(api::response_routes())
        .merge(api::analyze_routes())
        .merge(api::enrichment_routes())
        .merge(api::health_routes())
        .route("/api/events", get(api::event_stream))
        // The dashboard is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
