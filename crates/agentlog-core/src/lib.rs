//! Core types and error definitions for the agentlog session journal.
//!
//! This crate provides the types shared across all agentlog crates.
//!
//! # Main types
//!
//! - [`Event`]: One open-ended agent-lifecycle record.
//! - [`AgentlogError`]: Unified error enum for the journal.
//! - [`AgentlogResult`]: Convenience alias for `Result<T, AgentlogError>`.

/// Error types.
pub mod error;
/// The event record and its structural field names.
pub mod event;

pub use error::{AgentlogError, AgentlogResult};
pub use event::{
    Event, FIELD_EVENT, FIELD_SESSION_ID, FIELD_TASK, FIELD_TASK_ID, FIELD_TASK_NAME,
    SESSION_ENDED, SESSION_STARTED,
};
