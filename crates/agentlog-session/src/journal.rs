//! The ingestion state machine.

use crate::store::{Document, DocumentStore, TaskCounters};
use crate::task::{declared_task_name, TaskIdMinter};
use crate::tracker::{classify, session_start_record, BufferState, Classification};
use agentlog_core::{
    AgentlogError, AgentlogResult, Event, FIELD_TASK, FIELD_TASK_ID, FIELD_TASK_NAME,
    SESSION_STARTED,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Acknowledgement of one ingested event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Live buffer length after the operation.
    pub event_count: usize,
    /// How the event was classified.
    pub outcome: Classification,
}

/// Ingestion entry point: partitions the event stream into sessions, keeps
/// the live buffer on the current session and archives closed ones.
///
/// The service is the only writer of the live buffer and archive. Every
/// ingestion holds the live-buffer lock from read to final write.
pub struct JournalService {
    store: Arc<dyn DocumentStore>,
    minter: TaskIdMinter,
    live_lock: Mutex<()>,
}

impl JournalService {
    /// Creates a journal over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            minter: TaskIdMinter::new(store.clone()),
            store,
            live_lock: Mutex::new(()),
        }
    }

    /// Records one event.
    ///
    /// On error the live buffer, archive and counters are left as they were
    /// and the event must be considered not recorded.
    pub async fn ingest(&self, mut event: Event) -> AgentlogResult<Ack> {
        if event.is_kind(SESSION_STARTED) && event.session_id().is_none() {
            return Err(AgentlogError::InvalidEvent(
                "session_started requires a string session_id".into(),
            ));
        }

        let _guard = self.live_lock.lock().await;
        let mut live = self.store.read_document(Document::Events).await?;
        let outcome = classify(&live, &event);

        let event_count = match outcome {
            Classification::Start => self.start_session(live, event).await?,
            Classification::End => self.end_session(live, event).await?,
            Classification::Continue => {
                stamp_from_session(&live, &mut event);
                live.push(event);
                self.store.write_document(Document::Events, &live).await?;
                live.len()
            }
            Classification::Foreign => {
                debug!(
                    session_id = event.session_id().unwrap_or_default(),
                    "Dropping event from a session that is not current"
                );
                live.len()
            }
            Classification::Adopt => {
                warn!(
                    session_id = event.session_id().unwrap_or_default(),
                    kind = event.kind().unwrap_or_default(),
                    "No open session, recording event without task id"
                );
                live.push(event);
                self.store.write_document(Document::Events, &live).await?;
                live.len()
            }
        };

        debug!(%outcome, event_count, "Event ingested");
        Ok(Ack {
            event_count,
            outcome,
        })
    }

    async fn start_session(&self, live: Vec<Event>, mut event: Event) -> AgentlogResult<usize> {
        let task_name = declared_task_name(&event);
        let task_id = self.minter.mint(&task_name).await?;
        let session_id = event.session_id().unwrap_or_default().to_string();
        event.insert(FIELD_TASK_ID, task_id.to_string());
        event.insert(FIELD_TASK_NAME, task_name);

        let archived = match self.rotate(&live, &[event]).await {
            Ok(archived) => archived,
            Err(e) => {
                if let Err(release) = self.minter.release(&task_id).await {
                    error!(task_id = %task_id, error = %release, "Failed to release task id");
                }
                return Err(e);
            }
        };

        if !live.is_empty() {
            info!(
                flushed = live.len(),
                archived, "Superseded session flushed to archive"
            );
        }
        info!(session_id = %session_id, task_id = %task_id, "Session started");
        Ok(1)
    }

    async fn end_session(&self, mut live: Vec<Event>, mut event: Event) -> AgentlogResult<usize> {
        if BufferState::of(&live) == BufferState::Empty {
            warn!(
                session_id = event.session_id().unwrap_or_default(),
                "session_ended with no open session, archiving it alone"
            );
        }

        stamp_from_session(&live, &mut event);
        live.push(event);
        let archived = self.rotate(&live, &[]).await?;

        info!(
            task_id = live
                .first()
                .and_then(|e| e.get_str(FIELD_TASK_ID))
                .unwrap_or_default(),
            flushed = live.len(),
            archived,
            "Session ended"
        );
        Ok(0)
    }

    /// Appends `flushed` to the archive, then replaces the live buffer with
    /// `next`. If the live write fails the archive is written back as it was.
    /// Returns the archive length.
    async fn rotate(&self, flushed: &[Event], next: &[Event]) -> AgentlogResult<usize> {
        let before = self.store.read_document(Document::SavedEvents).await?;
        let archived = if flushed.is_empty() {
            before.len()
        } else {
            self.store
                .append_document(Document::SavedEvents, flushed)
                .await?
        };

        if let Err(e) = self.store.write_document(Document::Events, next).await {
            if !flushed.is_empty() {
                if let Err(restore) = self
                    .store
                    .write_document(Document::SavedEvents, &before)
                    .await
                {
                    error!(error = %restore, "Failed to restore archive after live write failure");
                }
            }
            return Err(e);
        }
        Ok(archived)
    }

    /// Events of the current session.
    pub async fn live_events(&self) -> AgentlogResult<Vec<Event>> {
        self.store.read_document(Document::Events).await
    }

    /// Every archived event, in archive order.
    pub async fn archived_events(&self) -> AgentlogResult<Vec<Event>> {
        self.store.read_document(Document::SavedEvents).await
    }

    /// The task counter table.
    pub async fn task_counters(&self) -> AgentlogResult<TaskCounters> {
        self.store.read_counters().await
    }
}

/// Copies task fields from the session's `session_started` record onto `event`.
fn stamp_from_session(live: &[Event], event: &mut Event) {
    let Some(start) = session_start_record(live) else {
        return;
    };
    for field in [FIELD_TASK_ID, FIELD_TASK_NAME] {
        if let Some(value) = start.get(field) {
            event.insert(field, value.clone());
        }
    }
    if !event.contains(FIELD_TASK) {
        if let Some(task) = start.get(FIELD_TASK) {
            event.insert(FIELD_TASK, task.clone());
        }
    }
}
