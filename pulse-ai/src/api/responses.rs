//! Survey response storage and statistics API handlers
//!
//! POST /api/responses, POST /api/responses/import, GET /api/responses,
//! DELETE /api/responses, GET /api/stats

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pulse_common::events::PulseEvent;

use crate::db::responses;
use crate::error::{ApiError, ApiResult};
use crate::models::{NewResponse, SurveyResponse};
use crate::services::enrichment::StartOutcome;
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

/// GET /api/responses query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// POST /api/responses/import request
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub responses: Vec<NewResponse>,
    /// Start an enrichment run once the rows are stored
    #[serde(default = "default_process")]
    pub process: bool,
}

fn default_process() -> bool {
    true
}

/// POST /api/responses/import response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
    pub enrichment_started: bool,
}

/// DELETE /api/responses response
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub deleted: usize,
}

/// Per-segment slice of GET /api/stats
#[derive(Debug, Serialize)]
pub struct GroupStat {
    pub count: i64,
    /// Percentage of all responses, 0.0 when the store is empty
    pub share: f64,
}

/// GET /api/stats response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: i64,
    /// Promoter share minus detractor share, in percentage points
    pub nps_score: f64,
    pub promoters: GroupStat,
    pub passives: GroupStat,
    pub detractors: GroupStat,
    /// Rows per sentiment label, unanalyzed rows under "N/A"
    pub sentiments: BTreeMap<String, i64>,
    pub top_topics: Vec<TopicStat>,
}

/// One aggregated topic in GET /api/stats
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStat {
    pub topic: String,
    pub count: usize,
    pub avg_confidence: f64,
}

/// POST /api/responses
///
/// Store one response. 201 with the stored row, 400 on an out-of-range
/// rating.
pub async fn create_response(
    State(state): State<AppState>,
    Json(request): Json<NewResponse>,
) -> ApiResult<(StatusCode, Json<SurveyResponse>)> {
    request.validate().map_err(ApiError::BadRequest)?;

    let stored = responses::insert(&state.db, &request).await?;
    tracing::debug!(id = %stored.id, rating = stored.rating, "Response stored");

    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/responses/import
///
/// Bulk insert; when `process` is true (the default) an enrichment run
/// is started over whatever is pending after the insert. A trigger
/// refusal (nothing pending, or a run already active) does not fail the
/// import.
pub async fn import_responses(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    for (index, new) in request.responses.iter().enumerate() {
        if let Err(reason) = new.validate() {
            return Err(ApiError::BadRequest(format!(
                "responses[{}]: {}",
                index, reason
            )));
        }
    }

    let imported = responses::insert_many(&state.db, &request.responses).await?;
    tracing::info!(imported, process = request.process, "Responses imported");
    state.event_bus.emit_lossy(PulseEvent::ResponsesImported {
        imported,
        timestamp: Utc::now(),
    });

    let mut enrichment_started = false;
    if request.process {
        match state.orchestrator.trigger().await {
            Ok(StartOutcome::Started { run_id, total }) => {
                tracing::info!(run_id = %run_id, total, "Enrichment run started after import");
                enrichment_started = true;
            }
            Ok(StartOutcome::NothingPending) => {}
            Ok(StartOutcome::AlreadyRunning) => {
                tracing::info!("Import finished while an enrichment run was active");
            }
            // The rows are stored; a failed trigger must not fail the import
            Err(e) => {
                tracing::error!(error = %e, "Failed to start enrichment run after import");
            }
        }
    }

    Ok(Json(ImportResponse {
        imported,
        enrichment_started,
    }))
}

/// GET /api/responses?limit=N
pub async fn list_responses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<SurveyResponse>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let rows = responses::list(&state.db, limit).await?;
    Ok(Json(rows))
}

/// DELETE /api/responses
pub async fn clear_responses(
    State(state): State<AppState>,
) -> ApiResult<Json<ClearResponse>> {
    let deleted = responses::clear_all(&state.db).await?;
    tracing::info!(deleted, "Response store cleared");
    Ok(Json(ClearResponse { deleted }))
}

/// GET /api/stats
///
/// NPS segmentation plus enrichment aggregates. Shares and the NPS
/// score are percentages over the whole store; an empty store reports
/// zeroes throughout.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let total = responses::count(&state.db).await?;
    let groups = responses::group_counts(&state.db).await?;

    let share = |count: i64| -> f64 {
        if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        }
    };
    let promoter_share = share(groups.promoters);
    let detractor_share = share(groups.detractors);

    let sentiments: BTreeMap<String, i64> = responses::sentiment_counts(&state.db)
        .await?
        .into_iter()
        .collect();

    Ok(Json(StatsResponse {
        total,
        nps_score: promoter_share - detractor_share,
        promoters: GroupStat {
            count: groups.promoters,
            share: promoter_share,
        },
        passives: GroupStat {
            count: groups.passives,
            share: share(groups.passives),
        },
        detractors: GroupStat {
            count: groups.detractors,
            share: detractor_share,
        },
        sentiments,
        top_topics: aggregate_topics(responses::all_topic_scores(&state.db).await?),
    }))
}

/// Collapse per-row topic scores into per-topic count and mean
/// confidence, most frequent first.
fn aggregate_topics(scores: Vec<crate::models::TopicScore>) -> Vec<TopicStat> {
    const TOP_TOPIC_LIMIT: usize = 10;

    let mut grouped: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for score in scores {
        let entry = grouped.entry(score.topic).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += score.confidence;
    }

    let mut stats: Vec<TopicStat> = grouped
        .into_iter()
        .map(|(topic, (count, sum))| TopicStat {
            topic,
            count,
            avg_confidence: sum / count as f64,
        })
        .collect();

    // BTreeMap iteration already ordered by name, so ties stay alphabetical
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats.truncate(TOP_TOPIC_LIMIT);
    stats
}

pub fn response_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/responses",
            post(create_response)
                .get(list_responses)
                .delete(clear_responses),
        )
        .route("/api/responses/import", post(import_responses))
        .route("/api/stats", get(get_stats))
}
