//! Enrichment progress types
//!
//! One run at a time; the tracker hands out read-only snapshots for the
//! status endpoint and keeps a terminal summary of the last finished run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only copy of the tracker state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Rows in the current (or most recent) run
    pub total: usize,

    /// Rows attempted so far, failed rows included
    pub processed: usize,

    /// Rows whose classification or persistence errored
    pub failed: usize,

    pub in_progress: bool,

    /// Admission time of the current/most recent run; None before any run
    pub start_time: Option<DateTime<Utc>>,

    /// Last counter change; None before any run
    pub last_update: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    /// Integer percent complete; 0 for an empty or not-yet-started run
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.processed as f64 / self.total as f64) * 100.0;
        pct.round().min(100.0) as u8
    }
}

/// Terminal record of a finished run, kept for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}
