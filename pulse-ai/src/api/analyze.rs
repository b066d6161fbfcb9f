//! Ad-hoc comment analysis API handlers
//!
//! POST /api/analyze-comment, POST /api/analyze-batch
//!
//! These endpoints classify text directly without touching the response
//! store. Used by the dashboard's "try it" box and for debugging prompt
//! or model changes.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::models::ClassifiedComment;
use crate::AppState;

/// POST /api/analyze-comment request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub comment: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// POST /api/analyze-batch request
#[derive(Debug, Deserialize)]
pub struct AnalyzeBatchRequest {
    pub comments: Vec<AnalyzeRequest>,
}

/// POST /api/analyze-batch response
#[derive(Debug, serde::Serialize)]
pub struct AnalyzeBatchResponse {
    pub results: Vec<ClassifiedComment>,
}

/// POST /api/analyze-comment
pub async fn analyze_comment(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<ClassifiedComment> {
    let language = request.language.as_deref().unwrap_or("en");
    let classified = state
        .classifier
        .classify_comment(&request.comment, language)
        .await;
    Json(classified)
}

/// POST /api/analyze-batch
///
/// Items are classified sequentially so a large batch cannot flood the
/// inference endpoint.
pub async fn analyze_batch(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeBatchRequest>,
) -> Json<AnalyzeBatchResponse> {
    let mut results = Vec::with_capacity(request.comments.len());
    for item in &request.comments {
        let language = item.language.as_deref().unwrap_or("en");
        results.push(state.classifier.classify_comment(&item.comment, language).await);
    }
    Json(AnalyzeBatchResponse { results })
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze-comment", post(analyze_comment))
        .route("/api/analyze-batch", post(analyze_batch))
}
