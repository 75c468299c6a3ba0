//! Durable, append-only record of replay progress.
//!
//! The log holds one JSON record per line, each carrying the absolute byte
//! offset into the dump reached so far. Recovery reads every record in order
//! and keeps the last one. Records are never rewritten, so there is no commit
//! or rollback logic: a position is either durably appended or it never
//! happened.

use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Extension appended to the dump path to derive the checkpoint log path.
pub const LOG_EXTENSION: &str = "log";

/// One checkpoint record: all dump bytes before `position` are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(alias = "Position")]
    pub position: u64,
}

/// Derives the checkpoint log path that sits next to a dump.
///
/// `dumps/prod.sql` maps to `dumps/prod.sql.log`.
pub fn log_path_for(dump: &Path) -> PathBuf {
    let mut name = dump.as_os_str().to_os_string();
    name.push(".");
    name.push(LOG_EXTENSION);
    PathBuf::from(name)
}

/// Recovers the last committed position from a checkpoint log.
///
/// A missing log means nothing has been processed yet and yields 0. Every
/// line must decode; a blank or torn record is reported as corruption rather
/// than skipped, since skipping could advance past unverified progress.
pub fn recover_position(path: &Path) -> Result<u64> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(ReplayError::Io {
                context: format!("failed to open checkpoint log {}", path.display()),
                source: e,
            })
        }
    };

    let reader = BufReader::new(file);
    let mut last = 0;

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(ReplayError::io(format!(
            "failed to read checkpoint log {}",
            path.display()
        )))?;

        let record: CheckpointRecord =
            serde_json::from_slice(&line).map_err(|source| ReplayError::CorruptCheckpoint {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
        last = record.position;
    }

    Ok(last)
}

/// Append handle on a checkpoint log.
pub struct CheckpointLog {
    path: PathBuf,
    file: File,
    last: Option<u64>,
}

impl CheckpointLog {
    /// Opens the log in append mode, creating it if needed. Never truncates.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(ReplayError::io(format!(
                "failed to open checkpoint log {}",
                path.display()
            )))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            last: None,
        })
    }

    /// Appends a record and syncs it to stable storage before returning.
    pub fn append(&mut self, position: u64) -> Result<()> {
        debug_assert!(
            self.last.map_or(true, |last| position >= last),
            "checkpoint positions must not decrease"
        );

        let mut record = serde_json::to_vec(&CheckpointRecord { position })
            .map_err(io::Error::from)
            .map_err(ReplayError::io("failed to encode checkpoint"))?;
        record.push(b'\n');

        self.file
            .write_all(&record)
            .map_err(ReplayError::io(format!(
                "failed to write checkpoint log {}",
                self.path.display()
            )))?;
        self.file.sync_all().map_err(ReplayError::io(format!(
            "failed to sync checkpoint log {}",
            self.path.display()
        )))?;

        self.last = Some(position);
        tracing::trace!(position, "checkpoint committed");
        Ok(())
    }

    /// Position of the last record appended through this handle.
    pub fn last_position(&self) -> Option<u64> {
        self.last
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
