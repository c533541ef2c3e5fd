use crate::ingest::{failure, ingest_handler};
use agentlog_session::JournalService;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::error;

/// Default cap on ingestion request bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// The journal every request goes through.
    pub journal: Arc<JournalService>,
}

/// The journal's HTTP surface.
pub struct JournalServer;

impl JournalServer {
    /// Build the router with the default body limit.
    pub fn build(journal: Arc<JournalService>) -> Router {
        Self::build_with_body_limit(journal, DEFAULT_MAX_BODY_BYTES)
    }

    /// Build the router, rejecting request bodies larger than `max_body_bytes`.
    pub fn build_with_body_limit(journal: Arc<JournalService>, max_body_bytes: usize) -> Router {
        let state = Arc::new(AppState { journal });

        Router::new()
            .route("/events", get(live_handler).post(ingest_handler))
            .route("/saved-events", get(archive_handler))
            .route("/task-counts", get(counters_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "agentlog"}))
}

async fn live_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.journal.live_events().await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read live buffer");
            failure(&e).into_response()
        }
    }
}

async fn archive_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.journal.archived_events().await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read archive");
            failure(&e).into_response()
        }
    }
}

async fn counters_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.journal.task_counters().await {
        Ok(counters) => Json(counters).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read task counters");
            failure(&e).into_response()
        }
    }
}
