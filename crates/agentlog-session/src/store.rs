//! Whole-document persistence: the live buffer, the archive and the task
//! counter table.

use agentlog_core::{AgentlogError, AgentlogResult, Event};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

/// Name of the task counter table.
pub const TASK_COUNTS: &str = "task-counts";

/// Normalized task name to the last sequence number handed out for it.
pub type TaskCounters = BTreeMap<String, u64>;

/// The event documents the journal persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// The live buffer: events of the currently open session only.
    Events,
    /// The archive of every flushed session, append-only.
    SavedEvents,
}

impl Document {
    /// Stable document name, also used as the file stem on disk.
    pub fn name(self) -> &'static str {
        match self {
            Document::Events => "events",
            Document::SavedEvents => "saved-events",
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-document persistence for the journal.
///
/// Reads never fail on a missing or corrupt document: both are reported as
/// empty. Writes replace the entire document or leave it untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a whole event document.
    async fn read_document(&self, doc: Document) -> AgentlogResult<Vec<Event>>;

    /// Replaces a whole event document.
    async fn write_document(&self, doc: Document, events: &[Event]) -> AgentlogResult<()>;

    /// Appends `events` to a document, returning its new length.
    async fn append_document(&self, doc: Document, events: &[Event]) -> AgentlogResult<usize> {
        let mut existing = self.read_document(doc).await?;
        existing.extend_from_slice(events);
        self.write_document(doc, &existing).await?;
        Ok(existing.len())
    }

    /// Reads the task counter table.
    async fn read_counters(&self) -> AgentlogResult<TaskCounters>;

    /// Replaces the task counter table.
    async fn write_counters(&self, counters: &TaskCounters) -> AgentlogResult<()>;
}

// ---------------------------------------------------------------------------
// FileDocumentStore
// ---------------------------------------------------------------------------

/// Directory-backed store: one pretty-printed JSON file per document.
pub struct FileDocumentStore {
    dir: PathBuf,
}

impl FileDocumentStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub async fn new(dir: PathBuf) -> AgentlogResult<Self> {
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AgentlogError::Store(format!(
                "Failed to create data dir '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the document files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the document called `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn read_json<T>(&self, name: &str) -> AgentlogResult<T>
    where
        T: DeserializeOwned + Default + Send,
    {
        let path = self.path_for(name);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(AgentlogError::Store(format!(
                    "Failed to read '{}': {e}",
                    path.display()
                )))
            }
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        // Bad UTF-8 surfaces here as a parse error, same as malformed JSON.
        match serde_json::from_slice(&data) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    document = name,
                    path = %path.display(),
                    error = %e,
                    "Corrupt document, treating as empty"
                );
                Ok(T::default())
            }
        }
    }

    // Write to a sibling temp file, then rename over the target so readers
    // only ever see a complete document.
    async fn write_json<T>(&self, name: &str, value: &T) -> AgentlogResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let path = self.path_for(name);
        let tmp = self.dir.join(format!("{name}.json.tmp"));
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            AgentlogError::Store(format!("Failed to write '{}': {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            AgentlogError::Store(format!(
                "Failed to replace '{}': {e}",
                path.display()
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn read_document(&self, doc: Document) -> AgentlogResult<Vec<Event>> {
        self.read_json(doc.name()).await
    }

    async fn write_document(&self, doc: Document, events: &[Event]) -> AgentlogResult<()> {
        self.write_json(doc.name(), events).await
    }

    async fn read_counters(&self) -> AgentlogResult<TaskCounters> {
        self.read_json(TASK_COUNTS).await
    }

    async fn write_counters(&self, counters: &TaskCounters) -> AgentlogResult<()> {
        self.write_json(TASK_COUNTS, counters).await
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// In-process store. Nothing survives the process; useful for tests and
/// for embedding the journal where persistence is handled elsewhere.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<Document, Vec<Event>>>,
    counters: RwLock<TaskCounters>,
    fail_writes: AtomicBool,
    failing_targets: RwLock<HashSet<&'static str>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, every write fails with a store error and leaves state unchanged.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Like [`fail_writes`](Self::fail_writes), but only for one target: a
    /// [`Document::name`] or [`TASK_COUNTS`].
    pub async fn fail_writes_to(&self, target: &'static str, fail: bool) {
        let mut targets = self.failing_targets.write().await;
        if fail {
            targets.insert(target);
        } else {
            targets.remove(target);
        }
    }

    async fn check_writable(&self, target: &str) -> AgentlogResult<()> {
        if self.fail_writes.load(Ordering::SeqCst)
            || self.failing_targets.read().await.contains(target)
        {
            return Err(AgentlogError::Store(format!(
                "Write to '{target}' rejected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read_document(&self, doc: Document) -> AgentlogResult<Vec<Event>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&doc)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_document(&self, doc: Document, events: &[Event]) -> AgentlogResult<()> {
        self.check_writable(doc.name()).await?;
        self.documents.write().await.insert(doc, events.to_vec());
        Ok(())
    }

    async fn read_counters(&self) -> AgentlogResult<TaskCounters> {
        Ok(self.counters.read().await.clone())
    }

    async fn write_counters(&self, counters: &TaskCounters) -> AgentlogResult<()> {
        self.check_writable(TASK_COUNTS).await?;
        *self.counters.write().await = counters.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
