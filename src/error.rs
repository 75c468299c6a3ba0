//! Error types for dump replay.
//!
//! Every failure in the library surfaces as a [`ReplayError`] and travels up to
//! the single top-level handler in `main`. Nothing here retries: restarting the
//! process and resuming from the checkpoint log is the retry mechanism.

use crate::executor::ExecutionError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors that stop a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Required input is missing or invalid. Raised before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file open, read, write, seek or sync failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        #[source]
        source: io::Error,
    },

    /// A checkpoint record could not be decoded. The log must be inspected by hand.
    #[error("corrupt checkpoint log {} at line {line}: {source}", .path.display())]
    CorruptCheckpoint {
        path: PathBuf,
        /// 1-based line number of the bad record.
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The recovered checkpoint points past the end of the dump.
    #[error("checkpoint position {position} is beyond the end of the dump ({length} bytes)")]
    CheckpointBeyondEnd { position: u64, length: u64 },

    /// The dump ended with bytes that were never consumed.
    #[error(
        "malformed dump: input ended with {residue} unconsumed bytes after position {position} (missing trailing newline?)"
    )]
    MalformedInput { position: u64, residue: usize },

    /// A complete statement was not valid UTF-8.
    #[error("statement at bytes {start}..{end} is not valid UTF-8")]
    InvalidUtf8 { start: u64, end: u64 },

    /// The database target could not be opened.
    #[error("failed to connect to database: {0}")]
    Connect(String),

    /// A statement failed with a non-recoverable database error.
    #[error("statement at bytes {start}..{end} failed: {source}")]
    Execution {
        start: u64,
        end: u64,
        #[source]
        source: ExecutionError,
    },
}

impl ReplayError {
    /// Builds a `map_err` adapter that tags an `io::Error` with context.
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> ReplayError {
        let context = context.into();
        move |source| ReplayError::Io { context, source }
    }
}
