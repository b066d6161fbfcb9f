//! HTTP API handlers for pulse-ai
//!
//! REST endpoints for response storage, ad-hoc comment analysis,
//! enrichment run control and aggregate statistics, plus an SSE stream
//! mirroring run progress.

pub mod analyze;
pub mod enrichment;
pub mod health;
pub mod responses;
pub mod sse;

pub use analyze::analyze_routes;
pub use enrichment::enrichment_routes;
pub use health::health_routes;
pub use responses::response_routes;
pub use sse::event_stream;
