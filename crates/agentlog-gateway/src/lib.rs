//! HTTP surface of the agentlog journal.
//!
//! `POST /events` ingests one event; `GET /events`, `GET /saved-events` and
//! `GET /task-counts` expose the persisted documents read-only.

pub mod ingest;
pub mod server;

pub use ingest::IngestResponse;
pub use server::{JournalServer, DEFAULT_MAX_BODY_BYTES};
