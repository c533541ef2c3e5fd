//! Task-id minting.
//!
//! A task id is the normalized task name plus a per-name counter, e.g.
//! `CHECKOUT-FLOW-2`. Counters live in the store's `task-counts` table.

use crate::store::DocumentStore;
use agentlog_core::{AgentlogResult, Event, FIELD_TASK, FIELD_TASK_NAME};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::debug;

/// Name used when a session declares no task at all.
pub const DEFAULT_TASK_NAME: &str = "task";

/// Normalized name used when nothing survives normalization.
pub const FALLBACK_NORMALIZED_NAME: &str = "TASK";

#[allow(clippy::expect_used)]
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s-]").expect("disallowed-chars regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Normalizes a task name: keeps `[A-Za-z0-9\s-]`, turns whitespace runs
/// into single hyphens, uppercases. `"Buy Now!"` becomes `"BUY-NOW"`.
///
/// Leading and trailing whitespace is trimmed before hyphenating, so
/// `"Buy Now "` also becomes `"BUY-NOW"` rather than `"BUY-NOW-"`. A name
/// with nothing left after stripping becomes [`FALLBACK_NORMALIZED_NAME`].
pub fn normalize_task_name(name: &str) -> String {
    let kept = DISALLOWED.replace_all(name, "");
    let hyphenated = WHITESPACE.replace_all(kept.trim(), "-");
    let normalized = hyphenated.to_uppercase();
    if normalized.is_empty() {
        FALLBACK_NORMALIZED_NAME.to_string()
    } else {
        normalized
    }
}

/// The task name a `session_started` event declares.
///
/// `task_name` takes precedence over `task`; blank values are skipped.
pub fn declared_task_name(event: &Event) -> String {
    [FIELD_TASK_NAME, FIELD_TASK]
        .into_iter()
        .filter_map(|field| event.get_str(field))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TASK_NAME)
        .to_string()
}

/// A minted task identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskId {
    /// Normalized task name.
    pub name: String,
    /// Per-name sequence number, starting at 1.
    pub sequence: u64,
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.name, self.sequence)
    }
}

/// Hands out task ids backed by the store's counter table.
pub struct TaskIdMinter {
    store: Arc<dyn DocumentStore>,
    // The table is rewritten whole, so increments for any name share one section.
    lock: Mutex<()>,
}

impl TaskIdMinter {
    /// Creates a minter over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Mints the next id for `task_name`. The counter is persisted before the
    /// id is returned, so an id is never handed out twice.
    pub async fn mint(&self, task_name: &str) -> AgentlogResult<TaskId> {
        let name = normalize_task_name(task_name);
        let _guard = self.lock.lock().await;

        let mut counters = self.store.read_counters().await?;
        let sequence = counters.get(&name).copied().unwrap_or(0) + 1;
        counters.insert(name.clone(), sequence);
        self.store.write_counters(&counters).await?;

        debug!(task = %name, sequence, "Task id minted");
        Ok(TaskId { name, sequence })
    }

    /// Gives back an id whose session was never recorded. The counter only
    /// moves back if `id` is still the latest one minted for its name.
    pub async fn release(&self, id: &TaskId) -> AgentlogResult<()> {
        let _guard = self.lock.lock().await;

        let mut counters = self.store.read_counters().await?;
        if counters.get(&id.name) != Some(&id.sequence) {
            return Ok(());
        }
        if id.sequence > 1 {
            counters.insert(id.name.clone(), id.sequence - 1);
        } else {
            counters.remove(&id.name);
        }
        self.store.write_counters(&counters).await?;

        debug!(task = %id.name, sequence = id.sequence, "Task id released");
        Ok(())
    }
}
