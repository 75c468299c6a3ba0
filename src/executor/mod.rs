//! Statement execution against a database target.
//!
//! The [`Database`] trait is the seam between the replay core and a concrete
//! client. Each backend maps its own error taxonomy onto [`ExecutionError`]:
//! a duplicate-key violation is recoverable because resumed replays routinely
//! re-insert rows that already landed; everything else is fatal.

mod duckdb_target;
mod mysql_target;

pub use duckdb_target::{DuckDbTarget, IN_MEMORY};
pub use mysql_target::{MySqlOptions, MySqlTarget};

use std::borrow::Cow;
use std::time::Instant;
use thiserror::Error;

/// Statements longer than this are abbreviated in progress logs.
const LOG_STATEMENT_MAX: usize = 80;
const LOG_STATEMENT_HEAD: usize = 60;
const LOG_STATEMENT_TAIL: usize = 10;

/// A failed statement, classified by the backend.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A uniqueness constraint rejected the row. Treated as already applied.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Any other database error.
    #[error("{0}")]
    Failed(String),
}

impl ExecutionError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExecutionError::DuplicateEntry(_))
    }
}

/// A database connection that runs one statement at a time.
pub trait Database {
    /// Runs one statement, without its terminator.
    fn execute(&mut self, sql: &str) -> Result<(), ExecutionError>;
}

impl<D: Database + ?Sized> Database for &mut D {
    fn execute(&mut self, sql: &str) -> Result<(), ExecutionError> {
        (**self).execute(sql)
    }
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn execute(&mut self, sql: &str) -> Result<(), ExecutionError> {
        (**self).execute(sql)
    }
}

/// How a statement ended up, when it did not stop the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    DuplicateIgnored,
}

/// Runs statements and logs per-statement progress.
pub struct Executor<D: Database> {
    db: D,
    total_bytes: Option<u64>,
}

impl<D: Database> Executor<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            total_bytes: None,
        }
    }

    /// Sets the stream length used to report progress fractions.
    pub fn set_total_bytes(&mut self, total_bytes: Option<u64>) {
        self.total_bytes = total_bytes;
    }

    pub fn into_database(self) -> D {
        self.db
    }

    /// Executes `statement`, which ends at absolute stream offset `end_position`.
    ///
    /// Duplicate-key failures come back as [`Outcome::DuplicateIgnored`]. Any
    /// other failure is returned as an error and must stop the replay.
    pub fn execute(
        &mut self,
        statement: &str,
        end_position: u64,
    ) -> Result<Outcome, ExecutionError> {
        let start = Instant::now();
        let result = self.db.execute(statement);
        let latency = start.elapsed();

        tracing::info!(
            progress = %format_progress(end_position, self.total_bytes),
            latency_ms = latency.as_millis() as u64,
            bytes = statement.len() + 1,
            statement = %abbreviate(statement),
            "executed statement"
        );

        match result {
            Ok(()) => Ok(Outcome::Applied),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(position = end_position, error = %e, "ignoring duplicate entry");
                Ok(Outcome::DuplicateIgnored)
            }
            Err(e) => {
                tracing::error!(position = end_position, error = %e, "statement failed");
                Err(e)
            }
        }
    }
}

fn format_progress(position: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => format!("{:.2}", position as f64 / total as f64),
        _ => "?".to_string(),
    }
}

/// Shortens long statements to head, `[...]`, tail for logging.
pub fn abbreviate(statement: &str) -> Cow<'_, str> {
    if statement.len() <= LOG_STATEMENT_MAX {
        return Cow::Borrowed(statement);
    }

    let mut head_end = LOG_STATEMENT_HEAD;
    while !statement.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = statement.len() - LOG_STATEMENT_TAIL;
    while !statement.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    Cow::Owned(format!(
        "{}[...]{}",
        &statement[..head_end],
        &statement[tail_start..]
    ))
}
