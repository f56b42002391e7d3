//! Monitor error types.

use thiserror::Error;

use sitewatch_state::StateError;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("another sitewatch run is in progress (pid {0})")]
    LockHeld(u32),

    #[error("state store error: {0}")]
    State(StateError),
}

impl From<StateError> for MonitorError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::LockHeld { pid } => MonitorError::LockHeld(pid),
            other => MonitorError::State(other),
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
