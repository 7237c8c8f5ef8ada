//! Error types for the contest core and its storage.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for contest operations.
pub type Result<T> = std::result::Result<T, ContestError>;

/// Failures raised by an [`EntryStore`](crate::storage::EntryStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt entry {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("Entry {0} vanished during update")]
    Vanished(i64),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures surfaced to callers of the contest service.
#[derive(Error, Debug)]
pub enum ContestError {
    #[error("Entry not found: {0}")]
    NotFound(i64),

    #[error("Account {0} already has an open entry")]
    DuplicateEntry(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContestError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ContestError::Store(_))
    }
}
