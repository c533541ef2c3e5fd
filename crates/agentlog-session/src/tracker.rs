//! Session tracking over the live buffer.
//!
//! Everything here is a pure function of the buffer contents and the
//! incoming event; no I/O happens in this module.

use agentlog_core::{Event, SESSION_ENDED, SESSION_STARTED};
use serde::Serialize;

/// How an incoming event relates to the session held in the live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A `session_started` event.
    Start,
    /// A `session_ended` event.
    End,
    /// Belongs to the current session.
    Continue,
    /// Carries a session id other than the current one.
    Foreign,
    /// No current session exists; accepted without session framing.
    Adopt,
}

impl Classification {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Start => "start",
            Classification::End => "end",
            Classification::Continue => "continue",
            Classification::Foreign => "foreign",
            Classification::Adopt => "adopt",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a session is open in the live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// No session.
    Empty,
    /// One session in progress.
    Open,
}

impl BufferState {
    /// State of the given live buffer.
    pub fn of(live: &[Event]) -> Self {
        if live.is_empty() {
            BufferState::Empty
        } else {
            BufferState::Open
        }
    }
}

/// The most recent `session_started` record in the buffer.
pub fn session_start_record(live: &[Event]) -> Option<&Event> {
    live.iter().rev().find(|e| e.is_kind(SESSION_STARTED))
}

/// Session id of the open session, if any.
///
/// The latest `session_started` wins over anything older still lingering in
/// the buffer; without one, the first element's id is used.
pub fn current_session_id(live: &[Event]) -> Option<&str> {
    session_start_record(live)
        .and_then(Event::session_id)
        .or_else(|| live.first().and_then(Event::session_id))
}

/// Classifies `event` against the live buffer.
pub fn classify(live: &[Event], event: &Event) -> Classification {
    if event.is_kind(SESSION_STARTED) {
        return Classification::Start;
    }
    if event.is_kind(SESSION_ENDED) {
        return Classification::End;
    }
    match (current_session_id(live), event.session_id()) {
        (None, _) => Classification::Adopt,
        (Some(current), Some(incoming)) if current == incoming => Classification::Continue,
        (Some(_), Some(_)) => Classification::Foreign,
        // Tolerated: an id-less event is attributed to the only open session.
        (Some(_), None) => Classification::Continue,
    }
}
