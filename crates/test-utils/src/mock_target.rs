//! In-process HTTP target that answers every request and records it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use axum::http::StatusCode as MockStatus;

/// How the mock target answers.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Status for paths without an override.
    pub status: StatusCode,
    /// Per-path status overrides, keyed by path without query.
    pub path_status: HashMap<String, StatusCode>,
    /// Artificial latency added before every response.
    pub latency: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            path_status: HashMap::new(),
            latency: Duration::ZERO,
        }
    }
}

impl MockBehavior {
    pub fn with_path_status(mut self, path: &str, status: StatusCode) -> Self {
        self.path_status.insert(path.to_string(), status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

struct MockState {
    behavior: MockBehavior,
    hits: Mutex<Vec<String>>,
}

/// A running mock target. The server stops when this is dropped.
pub struct MockTarget {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockTarget {
    /// Start a target answering 200 to everything.
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::default()).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let state = Arc::new(MockState {
            behavior,
            hits: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(record_request)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock target");
        let addr = listener.local_addr().expect("Failed to read mock target address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, as path plus query, in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().expect("hits lock poisoned").clone()
    }

    pub fn hit_count(&self) -> usize {
        self.state.hits.lock().expect("hits lock poisoned").len()
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_request(State(state): State<Arc<MockState>>, uri: Uri) -> (StatusCode, &'static str) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    state.hits.lock().expect("hits lock poisoned").push(target);

    if !state.behavior.latency.is_zero() {
        tokio::time::sleep(state.behavior.latency).await;
    }

    let status = state
        .behavior
        .path_status
        .get(uri.path())
        .copied()
        .unwrap_or(state.behavior.status);
    (status, "ok")
}
