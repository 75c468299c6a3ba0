//! DuckDB replay target.

use super::{Database, ExecutionError};
use crate::error::{ReplayError, Result};
use duckdb::Connection;

/// Target string that selects a transient in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// DuckDB prefixes primary key and unique violations with this error class.
const CONSTRAINT_ERROR_PREFIX: &str = "constraint error:";

/// A DuckDB database receiving replayed statements.
pub struct DuckDbTarget {
    conn: Connection,
}

impl DuckDbTarget {
    /// Opens a database file, creating it if needed, or an in-memory database
    /// for [`IN_MEMORY`].
    pub fn open(target: &str) -> Result<Self> {
        let opened = if target == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(target)
        };
        let conn = opened.map_err(|e| ReplayError::Connect(format!("{}: {}", target, e)))?;

        Ok(Self { conn })
    }

    /// Caps DuckDB's memory use, e.g. `"4GB"`.
    pub fn with_memory_limit(self, limit: &str) -> Result<Self> {
        self.conn
            .execute(&format!("SET memory_limit = '{}'", limit), [])
            .map_err(|e| ReplayError::Connect(format!("failed to set memory limit: {}", e)))?;
        Ok(self)
    }

    /// The underlying connection, for inspecting replayed data.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Database for DuckDbTarget {
    fn execute(&mut self, sql: &str) -> std::result::Result<(), ExecutionError> {
        self.conn.execute_batch(sql).map_err(classify_error)
    }
}

fn classify_error(err: duckdb::Error) -> ExecutionError {
    let message = err.to_string();
    if is_duplicate_key_message(&message) {
        ExecutionError::DuplicateEntry(message)
    } else {
        ExecutionError::Failed(message)
    }
}

/// Recognizes DuckDB's primary key and unique constraint violations.
///
/// DuckDB has no dedicated code for them, only the error class and text, e.g.
/// `Constraint Error: Duplicate key "id: 1" violates primary key constraint.`
/// Older releases said `duplicated key` instead. Other error classes never
/// count, even when they quote a statement containing those words.
fn is_duplicate_key_message(message: &str) -> bool {
    let lower = message.trim_start().to_lowercase();
    let Some(detail) = lower.strip_prefix(CONSTRAINT_ERROR_PREFIX) else {
        return false;
    };
    detail.contains("duplicate key") || detail.contains("duplicated key")
}
