//! Test helper utilities
//!
//! Shared utilities for testing pulse-ai

pub mod mock_ollama;

pub use mock_ollama::{MockOllama, MockReplies};

use pulse_ai::config::AiSettings;
use pulse_ai::AppState;
use pulse_common::events::EventBus;
use sqlx::SqlitePool;

/// Endpoint address that refuses connections immediately
pub const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:1";

/// In-memory database with the production schema applied
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    pulse_ai::db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");

    pool
}

/// Settings pointing at the given inference endpoint, tuned for tests
/// (single worker, no throttle, short deadline)
pub fn test_settings(base_url: &str) -> AiSettings {
    AiSettings {
        ollama_base_url: base_url.to_string(),
        ollama_model: "test-model".to_string(),
        request_timeout_ms: 2_000,
        worker_count: 1,
        throttle_ms: 0,
        db_max_lock_wait_ms: 1_000,
    }
}

/// Application state over an in-memory database and the given endpoint
pub async fn create_test_state(base_url: &str) -> AppState {
    let pool = create_test_db().await;
    let event_bus = EventBus::new(100);

    AppState::new(pool, event_bus, &test_settings(base_url))
        .expect("Failed to build application state")
}

/// Router plus its pool, for endpoint tests
pub async fn create_test_app(base_url: &str) -> (axum::Router, SqlitePool) {
    let state = create_test_state(base_url).await;
    let pool = state.db.clone();
    (pulse_ai::build_router(state), pool)
}

/// Poll the tracker until the active run finishes
pub async fn wait_for_idle(state: &AppState) {
    for _ in 0..200 {
        if !state.tracker.snapshot().await.in_progress {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("enrichment run did not finish within the polling window");
}
