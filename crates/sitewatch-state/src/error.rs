//! Error types for the status store and execution lock.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("another sitewatch run holds the lock (pid {pid})")]
    LockHeld { pid: u32 },
}
