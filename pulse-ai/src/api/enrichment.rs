//! Enrichment run API handlers
//!
//! POST /api/process-ai, POST /api/process-ai/cancel, GET /api/ai-status

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::services::enrichment::StartOutcome;
use crate::AppState;

/// POST /api/process-ai response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub total: usize,
}

/// GET /api/ai-status response
///
/// `progress` is the integer percentage; `isProcessing` mirrors
/// `inProgress` because the dashboard poller reads either name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatusResponse {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub in_progress: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub progress: u8,
    pub is_processing: bool,
}

/// POST /api/process-ai/cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/process-ai
///
/// Start an enrichment run over all pending responses. Returns
/// immediately; progress is observed via GET /api/ai-status or the
/// event stream. 409 when a run is already in progress.
pub async fn start_processing(
    State(state): State<AppState>,
) -> ApiResult<Json<ProcessResponse>> {
    match state.orchestrator.trigger().await? {
        StartOutcome::Started { run_id, total } => {
            tracing::info!(run_id = %run_id, total, "Enrichment run triggered via API");
            Ok(Json(ProcessResponse {
                success: true,
                message: format!("Enrichment started for {} responses", total),
                total,
            }))
        }
        StartOutcome::NothingPending => Ok(Json(ProcessResponse {
            success: true,
            message: "No responses pending enrichment".to_string(),
            total: 0,
        })),
        StartOutcome::AlreadyRunning => Err(ApiError::Conflict(
            "Enrichment run already in progress".to_string(),
        )),
    }
}

/// POST /api/process-ai/cancel
///
/// Request cooperative cancellation of the active run. 409 when no run
/// is active.
pub async fn cancel_processing(
    State(state): State<AppState>,
) -> ApiResult<Json<CancelResponse>> {
    if state.orchestrator.cancel().await {
        tracing::info!("Enrichment cancellation requested via API");
        Ok(Json(CancelResponse {
            success: true,
            message: "Cancellation requested".to_string(),
        }))
    } else {
        Err(ApiError::Conflict(
            "No enrichment run in progress".to_string(),
        ))
    }
}

/// GET /api/ai-status
pub async fn get_ai_status(State(state): State<AppState>) -> Json<AiStatusResponse> {
    let snapshot = state.tracker.snapshot().await;
    Json(AiStatusResponse {
        progress: snapshot.progress_percent(),
        is_processing: snapshot.in_progress,
        total: snapshot.total,
        processed: snapshot.processed,
        failed: snapshot.failed,
        in_progress: snapshot.in_progress,
        start_time: snapshot.start_time,
        last_update: snapshot.last_update,
    })
}

pub fn enrichment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/process-ai", post(start_processing))
        .route("/api/process-ai/cancel", post(cancel_processing))
        .route("/api/ai-status", get(get_ai_status))
}
