//! `POST /events`.

use crate::server::AppState;
use agentlog_core::{AgentlogError, AgentlogResult, Event};
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Body returned by `POST /events` and by failing read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Whether the event was recorded.
    pub success: bool,
    /// Live buffer length after the operation (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_count: Option<usize>,
    /// Failure description (failure only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    /// A success body carrying the live buffer length.
    pub fn accepted(event_count: usize) -> Self {
        Self {
            success: true,
            event_count: Some(event_count),
            error: None,
        }
    }

    /// A failure body.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            event_count: None,
            error: Some(error.into()),
        }
    }
}

/// Maps a journal error to its HTTP status and failure body.
pub fn failure(err: &AgentlogError) -> (StatusCode, Json<IngestResponse>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(IngestResponse::failed(err.to_string())))
}

/// Decodes a request body into an event.
pub fn parse_event(body: &[u8]) -> AgentlogResult<Event> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| AgentlogError::InvalidEvent(format!("malformed JSON: {e}")))?;
    Event::from_value(value)
}

/// Axum handler for event ingestion.
///
/// Route: `POST /events`
///
/// Malformed bodies are rejected before the journal is touched.
pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<IngestResponse>) {
    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected malformed event");
            return failure(&e);
        }
    };

    match state.journal.ingest(event).await {
        Ok(ack) => (StatusCode::OK, Json(IngestResponse::accepted(ack.event_count))),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected event");
            failure(&e)
        }
        Err(e) => {
            error!(error = %e, "Failed to record event");
            failure(&e)
        }
    }
}
