use thiserror::Error;

/// A convenience `Result` alias using [`AgentlogError`].
pub type AgentlogResult<T> = Result<T, AgentlogError>;

/// Top-level error type for the journal.
///
/// Each variant corresponds to one failure class a caller can observe.
#[derive(Error, Debug)]
pub enum AgentlogError {
    /// The submitted event is not usable (not an object, missing a required field).
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// A persisted document could not be read or written.
    #[error("Store error: {0}")]
    Store(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentlogError {
    /// Returns true when the failure was caused by the submitted input rather
    /// than by the journal or its storage.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AgentlogError::InvalidEvent(_))
    }
}
