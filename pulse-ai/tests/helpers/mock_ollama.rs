//! Minimal in-process stand-in for the Ollama HTTP API
//!
//! Serves POST /api/generate and GET /api/tags on an ephemeral port.
//! Replies are canned per prompt kind; the generate call counter lets
//! tests assert how often the endpoint was actually consulted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Canned generate replies
#[derive(Clone)]
pub struct MockReplies {
    /// Body of `response` for sentiment prompts
    pub sentiment: String,
    /// Body of `response` for topic prompts
    pub topics: String,
    /// Artificial latency per generate call
    pub delay_ms: u64,
}

impl Default for MockReplies {
    fn default() -> Self {
        Self {
            sentiment: json!({
                "sentiment": "negative",
                "confidence": 0.92,
                "explanation": "complains about crashes"
            })
            .to_string(),
            topics: json!({
                "topics": [{"topic": "App Performance", "confidence": 0.9}]
            })
            .to_string(),
            delay_ms: 0,
        }
    }
}

impl MockReplies {
    /// Replies that no parser stage can use, forcing the keyword fallback
    pub fn garbage() -> Self {
        Self {
            sentiment: "I would say it feels rather negative to me!".to_string(),
            topics: "Probably something about performance?".to_string(),
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

struct MockState {
    replies: MockReplies,
    generate_calls: AtomicUsize,
}

/// In-process inference endpoint bound to an ephemeral port
pub struct MockOllama {
    pub base_url: String,
    state: Arc<MockState>,
    server: tokio::task::JoinHandle<()>,
}

impl MockOllama {
    pub async fn start(replies: MockReplies) -> Self {
        let state = Arc::new(MockState {
            replies,
            generate_calls: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/generate", post(generate))
            .route("/api/tags", get(tags))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock endpoint");
        let addr = listener.local_addr().expect("mock endpoint has no address");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// Number of POST /api/generate calls received so far
    pub fn generate_calls(&self) -> usize {
        self.state.generate_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockOllama {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn generate(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.generate_calls.fetch_add(1, Ordering::SeqCst);

    if state.replies.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.replies.delay_ms)).await;
    }

    let prompt = body["prompt"].as_str().unwrap_or_default();
    let reply = if prompt.contains("Classify the sentiment") {
        state.replies.sentiment.clone()
    } else {
        state.replies.topics.clone()
    };

    Json(json!({ "response": reply }))
}

async fn tags(State(_state): State<Arc<MockState>>) -> Json<Value> {
    Json(json!({ "models": [{"name": "test-model"}] }))
}
