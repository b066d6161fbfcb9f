//! Enrichment run orchestration
//!
//! A run selects every pending row, feeds the rows through a bounded pool
//! of classification workers, writes results back and advances the shared
//! progress tracker. Triggers return immediately; callers poll the status
//! endpoint or subscribe to the event stream.
//!
//! Per-row failures are absorbed: they are logged, counted, and the run
//! continues. The only fatal condition is the store being unavailable at
//! scan time, which surfaces to the trigger caller before any run starts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pulse_common::events::{EventBus, PulseEvent};
use pulse_common::Result;

use crate::db;
use crate::models::{ClassifiedComment, SurveyResponse};
use crate::services::{CommentClassifier, ProgressTracker};

/// Outcome of a run trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Run admitted; processing continues in the background
    Started { run_id: Uuid, total: usize },
    /// No rows await enrichment; nothing was started and the tracker is
    /// untouched
    NothingPending,
    /// Another run holds the single-run slot
    AlreadyRunning,
}

/// Coordinates enrichment runs over the response store
pub struct EnrichmentOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    tracker: Arc<ProgressTracker>,
    classifier: Arc<CommentClassifier>,
    worker_count: usize,
    throttle: Duration,
    db_max_lock_wait_ms: u64,
    active_cancel: RwLock<Option<CancellationToken>>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        tracker: Arc<ProgressTracker>,
        classifier: Arc<CommentClassifier>,
        worker_count: usize,
        throttle_ms: u64,
        db_max_lock_wait_ms: u64,
    ) -> Self {
        Self {
            db,
            event_bus,
            tracker,
            classifier,
            worker_count: worker_count.max(1),
            throttle: Duration::from_millis(throttle_ms),
            db_max_lock_wait_ms,
            active_cancel: RwLock::new(None),
        }
    }

    /// Start a run over all pending rows; returns immediately.
    ///
    /// Admission is decided by the tracker's check-and-set, so two
    /// concurrent triggers cannot both start a run: the loser sees
    /// `AlreadyRunning`.
    pub async fn trigger(self: &Arc<Self>) -> Result<StartOutcome> {
        if self.tracker.snapshot().await.in_progress {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let rows = db::responses::pending_for_enrichment(&self.db).await?;
        if rows.is_empty() {
            tracing::info!("No pending responses, enrichment run not started");
            return Ok(StartOutcome::NothingPending);
        }

        let Some(run_id) = self.tracker.try_start(rows.len()).await else {
            return Ok(StartOutcome::AlreadyRunning);
        };

        let cancel_token = CancellationToken::new();
        *self.active_cancel.write().await = Some(cancel_token.clone());

        let total = rows.len();
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run(run_id, rows, cancel_token).await;
        });

        Ok(StartOutcome::Started { run_id, total })
    }

    /// Request cooperative cancellation of the active run.
    ///
    /// Returns false when no run is active. In-flight model calls finish
    /// (bounded by their deadline); remaining rows are skipped.
    pub async fn cancel(&self) -> bool {
        let guard = self.active_cancel.read().await;
        let Some(token) = guard.as_ref() else {
            return false;
        };
        if !self.tracker.snapshot().await.in_progress {
            return false;
        }

        token.cancel();
        tracing::info!("Enrichment run cancellation requested");
        true
    }

    /// Background run body: worker pool over a shared row queue
    async fn run(self: Arc<Self>, run_id: Uuid, rows: Vec<SurveyResponse>, cancel_token: CancellationToken) {
        let total = rows.len();
        tracing::info!(
            run_id = %run_id,
            total,
            workers = self.worker_count,
            "Enrichment run started"
        );
        self.event_bus.emit_lossy(PulseEvent::EnrichmentRunStarted {
            run_id,
            total,
            timestamp: Utc::now(),
        });

        let queue = Arc::new(Mutex::new(VecDeque::from(rows)));

        let mut handles = Vec::new();
        for worker in 0..self.worker_count {
            let orchestrator = self.clone();
            let queue = queue.clone();
            let token = cancel_token.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if token.is_cancelled() {
                        break;
                    }

                    let row = queue.lock().await.pop_front();
                    let Some(row) = row else { break };

                    match orchestrator.process_row(run_id, &row).await {
                        Ok(result) => {
                            orchestrator.tracker.increment_processed().await;
                            orchestrator.event_bus.emit_lossy(PulseEvent::ResponseEnriched {
                                run_id,
                                response_id: row.id,
                                sentiment: result.sentiment.to_string(),
                                fallback: result.fallback,
                                timestamp: Utc::now(),
                            });
                        }
                        Err(e) => {
                            tracing::error!(
                                run_id = %run_id,
                                response_id = %row.id,
                                error = %e,
                                "Row enrichment failed, continuing with remaining rows"
                            );
                            orchestrator.tracker.record_failure().await;
                            orchestrator
                                .event_bus
                                .emit_lossy(PulseEvent::ResponseEnrichmentFailed {
                                    run_id,
                                    response_id: row.id,
                                    error: e.to_string(),
                                    timestamp: Utc::now(),
                                });
                        }
                    }

                    let snapshot = orchestrator.tracker.snapshot().await;
                    orchestrator.event_bus.emit_lossy(PulseEvent::EnrichmentProgress {
                        run_id,
                        processed: snapshot.processed,
                        failed: snapshot.failed,
                        total: snapshot.total,
                        percent: snapshot.progress_percent(),
                        timestamp: Utc::now(),
                    });

                    // Inter-row delay keeps the local inference backend from
                    // being saturated; meaningful because the default pool
                    // width is 1
                    if !orchestrator.throttle.is_zero() {
                        tokio::time::sleep(orchestrator.throttle).await;
                    }
                }

                tracing::debug!(run_id = %run_id, worker, "Enrichment worker finished");
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(run_id = %run_id, error = %e, "Enrichment worker panicked");
            }
        }

        let cancelled = cancel_token.is_cancelled();
        *self.active_cancel.write().await = None;

        if let Some(summary) = self.tracker.complete(cancelled).await {
            tracing::info!(
                run_id = %run_id,
                processed = summary.processed,
                failed = summary.failed,
                total = summary.total,
                cancelled,
                duration_ms = summary.duration_ms(),
                "Enrichment run completed"
            );
            self.event_bus.emit_lossy(PulseEvent::EnrichmentRunCompleted {
                run_id,
                processed: summary.processed,
                failed: summary.failed,
                total: summary.total,
                cancelled,
                duration_ms: summary.duration_ms().max(0) as u64,
                timestamp: Utc::now(),
            });
        }
    }

    /// Classify one row and persist the result
    async fn process_row(&self, run_id: Uuid, row: &SurveyResponse) -> Result<ClassifiedComment> {
        let result = self
            .classifier
            .classify_comment(&row.comment, &row.language)
            .await;

        if result.fallback {
            tracing::warn!(
                run_id = %run_id,
                response_id = %row.id,
                "Classification degraded to keyword fallback"
            );
        }

        db::responses::update_enrichment(
            &self.db,
            row.id,
            result.sentiment,
            result.sentiment_confidence,
            &result.topics,
            self.db_max_lock_wait_ms,
        )
        .await?;

        tracing::debug!(
            run_id = %run_id,
            response_id = %row.id,
            sentiment = %result.sentiment,
            topics = result.topics.len(),
            "Row enriched"
        );

        Ok(result)
    }
}
