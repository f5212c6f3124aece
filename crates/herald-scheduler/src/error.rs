use thiserror::Error;

/// Errors that can occur within the scheduling core.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Bad or missing input fields. Surfaced to the caller with a
    /// corrective message; never a system fault.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No entry with the given ID exists in the store.
    #[error("Entry not found: {id}")]
    NotFound { id: String },

    /// The recurrence rule cannot produce a next occurrence.
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
