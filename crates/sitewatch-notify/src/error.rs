//! Mail delivery errors.

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail command is empty")]
    EmptyCommand,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("mail pipe error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}: {stderr}")]
    Rejected {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}
