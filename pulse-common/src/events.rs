//! Event types for the Pulse event system
//!
//! Provides shared event definitions and the EventBus used by the services.
//! Events are broadcast in-process and can be serialized for SSE transmission.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pulse event types
///
/// Events are broadcast via [`EventBus`]; every variant carries its own
/// timestamp so late subscribers can order what they receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PulseEvent {
    /// An enrichment run was admitted and is about to process rows
    EnrichmentRunStarted {
        run_id: Uuid,
        /// Number of pending rows selected for this run
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress during an enrichment run
    EnrichmentProgress {
        run_id: Uuid,
        processed: usize,
        failed: usize,
        total: usize,
        /// Integer percentage, 0 when total is 0
        percent: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One response row received its sentiment/topics
    ResponseEnriched {
        run_id: Uuid,
        response_id: Uuid,
        sentiment: String,
        /// True when the keyword fallback produced the result
        fallback: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One response row failed classification or persistence; the run continues
    ResponseEnrichmentFailed {
        run_id: Uuid,
        response_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The enrichment run reached its terminal state
    EnrichmentRunCompleted {
        run_id: Uuid,
        processed: usize,
        failed: usize,
        total: usize,
        cancelled: bool,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A bulk ingest finished inserting survey responses
    ResponsesImported {
        imported: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PulseEvent {
    /// Stable event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            PulseEvent::EnrichmentRunStarted { .. } => "EnrichmentRunStarted",
            PulseEvent::EnrichmentProgress { .. } => "EnrichmentProgress",
            PulseEvent::ResponseEnriched { .. } => "ResponseEnriched",
            PulseEvent::ResponseEnrichmentFailed { .. } => "ResponseEnrichmentFailed",
            PulseEvent::EnrichmentRunCompleted { .. } => "EnrichmentRunCompleted",
            PulseEvent::ResponsesImported { .. } => "ResponsesImported",
        }
    }
}

/// In-process broadcast bus for [`PulseEvent`]
///
/// Cloneable handle over a `tokio::sync::broadcast` channel. Single writer
/// (the enrichment loop) and any number of subscribers (SSE handlers, tests).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PulseEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Old events are dropped once `capacity` unread events accumulate for a
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PulseEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` when at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PulseEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<PulseEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where no subscriber is listening
    ///
    /// Progress and lifecycle notifications use this; it is acceptable for
    /// them to go unobserved.
    pub fn emit_lossy(&self, event: PulseEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
