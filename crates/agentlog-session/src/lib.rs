//! Session-scoped event journal.
//!
//! - [`store`] persists whole documents (live buffer, archive, task counters).
//! - [`tracker`] decides which session an incoming event belongs to.
//! - [`task`] normalizes task names and mints task ids.
//! - [`journal`] drives session transitions on top of the three.

pub mod journal;
pub mod store;
pub mod task;
pub mod tracker;

pub use journal::{Ack, JournalService};
pub use store::{
    Document, DocumentStore, FileDocumentStore, MemoryDocumentStore, TaskCounters, TASK_COUNTS,
};
pub use task::{declared_task_name, normalize_task_name, TaskId, TaskIdMinter};
pub use tracker::{classify, current_session_id, BufferState, Classification};
