//! Enrichment progress tracking
//!
//! One tracker lives in the application state and is shared by the run
//! loop (single writer) and the status endpoint (many readers). Run
//! admission is a check-and-set under the write lock, so two concurrent
//! triggers cannot both start a run.

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ProgressSnapshot, RunSummary};

#[derive(Debug, Default)]
struct TrackerState {
    run_id: Option<Uuid>,
    total: usize,
    processed: usize,
    failed: usize,
    in_progress: bool,
    start_time: Option<chrono::DateTime<Utc>>,
    last_update: Option<chrono::DateTime<Utc>>,
    last_run: Option<RunSummary>,
}

/// Run-scoped progress counters with atomic admission
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: RwLock<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new run: resets the counters and returns the run id, or
    /// None when a run is already in progress.
    pub async fn try_start(&self, total: usize) -> Option<Uuid> {
        let mut state = self.state.write().await;
        if state.in_progress {
            return None;
        }

        let run_id = Uuid::new_v4();
        let now = Utc::now();
        state.run_id = Some(run_id);
        state.total = total;
        state.processed = 0;
        state.failed = 0;
        state.in_progress = true;
        state.start_time = Some(now);
        state.last_update = Some(now);

        Some(run_id)
    }

    /// Count one successfully processed row
    pub async fn increment_processed(&self) {
        let mut state = self.state.write().await;
        state.processed += 1;
        state.last_update = Some(Utc::now());
    }

    /// Count one failed row; failed rows still count as processed so that
    /// partial failure cannot hang the reported progress
    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        state.processed += 1;
        state.failed += 1;
        state.last_update = Some(Utc::now());
    }

    /// End the current run and keep its terminal summary
    pub async fn complete(&self, cancelled: bool) -> Option<RunSummary> {
        let mut state = self.state.write().await;
        if !state.in_progress {
            return None;
        }

        let now = Utc::now();
        state.in_progress = false;
        state.last_update = Some(now);

        let summary = RunSummary {
            run_id: state.run_id.unwrap_or_else(Uuid::nil),
            total: state.total,
            processed: state.processed,
            failed: state.failed,
            started_at: state.start_time.unwrap_or(now),
            ended_at: now,
            cancelled,
        };
        state.last_run = Some(summary.clone());

        Some(summary)
    }

    /// Read-only copy for the status endpoint
    pub async fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.read().await;
        ProgressSnapshot {
            total: state.total,
            processed: state.processed,
            failed: state.failed,
            in_progress: state.in_progress,
            start_time: state.start_time,
            last_update: state.last_update,
        }
    }

    /// Terminal summary of the most recently finished run
    pub async fn last_run(&self) -> Option<RunSummary> {
        self.state.read().await.last_run.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_lifecycle() {
        let tracker = ProgressTracker::new();

        let before = tracker.snapshot().await;
        assert!(!before.in_progress);
        assert!(before.start_time.is_none());

        let run_id = tracker.try_start(10).await.expect("admission");

        for _ in 0..10 {
            tracker.increment_processed().await;
        }

        let snap = tracker.snapshot().await;
        assert_eq!(snap.total, 10);
        assert_eq!(snap.processed, 10);
        assert_eq!(snap.failed, 0);
        assert!(snap.in_progress);
        assert_eq!(snap.progress_percent(), 100);

        let summary = tracker.complete(false).await.expect("summary");
        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.processed, 10);
        assert!(!summary.cancelled);

        let after = tracker.snapshot().await;
        assert!(!after.in_progress);
        assert_eq!(tracker.last_run().await.unwrap().run_id, run_id);
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_in_progress() {
        let tracker = ProgressTracker::new();

        assert!(tracker.try_start(5).await.is_some());
        assert!(tracker.try_start(3).await.is_none());

        tracker.complete(false).await;
        assert!(tracker.try_start(3).await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_admission_admits_exactly_one() {
        let tracker = Arc::new(ProgressTracker::new());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move { tracker.try_start(1).await }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_failures_count_as_processed() {
        let tracker = ProgressTracker::new();
        tracker.try_start(4).await.unwrap();

        tracker.increment_processed().await;
        tracker.record_failure().await;
        tracker.increment_processed().await;
        tracker.record_failure().await;

        let snap = tracker.snapshot().await;
        assert_eq!(snap.processed, 4);
        assert_eq!(snap.failed, 2);
        assert_eq!(snap.progress_percent(), 100);
    }

    #[tokio::test]
    async fn test_new_run_resets_counters() {
        let tracker = ProgressTracker::new();

        tracker.try_start(3).await.unwrap();
        tracker.increment_processed().await;
        tracker.complete(false).await;

        tracker.try_start(7).await.unwrap();
        let snap = tracker.snapshot().await;
        assert_eq!(snap.total, 7);
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.failed, 0);
    }

    #[tokio::test]
    async fn test_complete_without_run_is_noop() {
        let tracker = ProgressTracker::new();
        assert!(tracker.complete(false).await.is_none());
    }
}
