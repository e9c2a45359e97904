use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for connector and orchestrator operations.
///
/// Configuration problems fail fast before any external process is
/// launched; everything else carries the diagnostic output of the
/// client tool so operators can fix credentials or environment
/// without re-running by hand.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection specification or requested options are invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The connectivity probe failed; carries the combined output of
    /// the client tool.
    #[error("connection test failed: {0}")]
    Connection(String),

    /// A required external client binary could not be located.
    #[error("required tool '{0}' not found on PATH")]
    ToolNotFound(String),

    /// The dump tool exited non-zero or streaming failed mid-dump.
    #[error("backup failed: {0}")]
    Backup(String),

    /// The restore tool exited non-zero or streaming failed mid-replay.
    #[error("restore failed: {0}")]
    Restore(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
