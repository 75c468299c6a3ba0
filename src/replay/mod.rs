//! Replay driver: streams a dump through the buffer, classifier and executor,
//! committing a checkpoint after every consumed line.
//!
//! The loop is strictly sequential. A line's checkpoint is appended and
//! synced only after the line was skipped or its statement succeeded, and
//! before the next line is looked at, so the log never claims progress that
//! did not happen.

use crate::buffer::{Fill, StreamBuffer, DEFAULT_CAPACITY};
use crate::checkpoint::{log_path_for, recover_position, CheckpointLog};
use crate::classifier::{strip_terminator, Classifier, LineClass, SqlDialect};
use crate::error::{ReplayError, Result};
use crate::executor::{Database, Executor, Outcome};
use crate::source;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Immutable replay settings, built once at startup.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub dump: PathBuf,
    /// Overrides the log path derived from the dump path.
    pub checkpoint: Option<PathBuf>,
    pub dialect: SqlDialect,
    pub buffer_capacity: usize,
}

impl ReplayConfig {
    pub fn new(dump: impl Into<PathBuf>) -> Self {
        Self {
            dump: dump.into(),
            checkpoint: None,
            dialect: SqlDialect::default(),
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Path of the checkpoint log for this dump.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint
            .clone()
            .unwrap_or_else(|| log_path_for(&self.dump))
    }

    /// Rejects missing inputs before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.dump.as_os_str().is_empty() {
            return Err(ReplayError::Config("no dump file specified".to_string()));
        }
        if !self.dump.is_file() {
            return Err(ReplayError::Config(format!(
                "dump file does not exist: {}",
                self.dump.display()
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(ReplayError::Config(
                "buffer capacity must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a completed replay.
#[derive(Debug, Default, Clone)]
pub struct ReplayStats {
    /// Position recovered from the checkpoint log.
    pub start_position: u64,
    /// Position of the last committed checkpoint.
    pub end_position: u64,
    pub statements_executed: u64,
    pub duplicates_ignored: u64,
    /// Blank and comment lines.
    pub lines_skipped: u64,
    pub checkpoints_written: u64,
    pub buffer_growths: usize,
    pub elapsed: Duration,
}

impl std::fmt::Display for ReplayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} statements executed ({} duplicates ignored), {} lines skipped, bytes {}..{} in {:.2}s",
            self.statements_executed,
            self.duplicates_ignored,
            self.lines_skipped,
            self.start_position,
            self.end_position,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Where the driver is in the replay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the next newline in buffered bytes.
    Scanning,
    /// A newline was found at this buffer index.
    Classifying(usize),
    /// Consume up to this buffer index and checkpoint.
    Committing(usize),
    /// No newline buffered; read more.
    Filling,
    /// Source exhausted; check nothing was left over.
    Draining,
}

/// Replays a dump against a database.
pub struct Replayer<'a, D: Database> {
    config: &'a ReplayConfig,
    executor: Executor<D>,
}

impl<'a, D: Database> Replayer<'a, D> {
    pub fn new(config: &'a ReplayConfig, db: D) -> Self {
        Self {
            config,
            executor: Executor::new(db),
        }
    }

    pub fn into_database(self) -> D {
        self.executor.into_database()
    }

    /// Recovers the checkpoint, positions the dump there and replays the rest.
    pub fn run(&mut self) -> Result<ReplayStats> {
        self.run_with_progress(None::<fn(u64)>)
    }

    /// Like [`run`](Self::run), reporting absolute offsets into the dump file
    /// to `on_progress` as it is read.
    pub fn run_with_progress<F>(&mut self, on_progress: Option<F>) -> Result<ReplayStats>
    where
        F: Fn(u64) + 'static,
    {
        self.config.validate()?;

        let log_path = self.config.checkpoint_path();
        let start = recover_position(&log_path)?;
        let dump = source::open_at(&self.config.dump, start, on_progress)?;

        tracing::info!(
            dump = %self.config.dump.display(),
            checkpoint = %log_path.display(),
            start,
            compression = %dump.compression,
            dialect = %self.config.dialect,
            "replaying dump"
        );

        let mut log = CheckpointLog::open(&log_path)?;
        self.replay_from(dump.reader, start, dump.stream_len, &mut log)
    }

    /// Replays `source`, whose first byte is at absolute stream offset `start`.
    pub fn replay_from<R: Read>(
        &mut self,
        mut source: R,
        start: u64,
        stream_len: Option<u64>,
        log: &mut CheckpointLog,
    ) -> Result<ReplayStats> {
        let started = Instant::now();
        let classifier = self.config.dialect;
        let mut buffer = StreamBuffer::new(self.config.buffer_capacity, start);
        let mut stats = ReplayStats {
            start_position: start,
            end_position: start,
            ..Default::default()
        };
        self.executor.set_total_bytes(stream_len);

        let mut state = State::Scanning;
        loop {
            state = match state {
                State::Scanning => match buffer.next_boundary() {
                    Some(boundary) => State::Classifying(boundary),
                    None => State::Filling,
                },
                State::Classifying(boundary) => {
                    let candidate = buffer.candidate(boundary);
                    match classifier.classify(candidate.bytes) {
                        LineClass::Incomplete => State::Scanning,
                        LineClass::Skip => {
                            stats.lines_skipped += 1;
                            State::Committing(boundary + 1)
                        }
                        LineClass::Execute => {
                            let statement = std::str::from_utf8(strip_terminator(candidate.bytes))
                                .map_err(|_| ReplayError::InvalidUtf8 {
                                    start: candidate.start_position,
                                    end: candidate.end_position,
                                })?;
                            let outcome = self
                                .executor
                                .execute(statement, candidate.end_position)
                                .map_err(|source| ReplayError::Execution {
                                    start: candidate.start_position,
                                    end: candidate.end_position,
                                    source,
                                })?;
                            stats.statements_executed += 1;
                            if outcome == Outcome::DuplicateIgnored {
                                stats.duplicates_ignored += 1;
                            }
                            State::Committing(boundary + 1)
                        }
                    }
                }
                State::Committing(next_start) => {
                    buffer.advance_consumed(next_start);
                    log.append(buffer.position())?;
                    stats.checkpoints_written += 1;
                    stats.end_position = buffer.position();
                    State::Scanning
                }
                State::Filling => {
                    buffer.reclaim();
                    match buffer
                        .fill(&mut source)
                        .map_err(ReplayError::io("failed to read dump"))?
                    {
                        Fill::Read(_) => State::Scanning,
                        Fill::EndOfStream => State::Draining,
                    }
                }
                State::Draining => {
                    if !buffer.is_drained() {
                        return Err(ReplayError::MalformedInput {
                            position: buffer.position(),
                            residue: buffer.residue(),
                        });
                    }
                    break;
                }
            };
        }

        stats.buffer_growths = buffer.growth_events();
        stats.elapsed = started.elapsed();
        tracing::info!(
            end = stats.end_position,
            executed = stats.statements_executed,
            duplicates = stats.duplicates_ignored,
            skipped = stats.lines_skipped,
            "replay complete"
        );
        Ok(stats)
    }
}

/// Reports how far a previous replay of `dump` got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStatus {
    pub checkpoint: PathBuf,
    pub position: u64,
    /// Statement stream length, known for uncompressed dumps.
    pub stream_len: Option<u64>,
}

impl ReplayStatus {
    pub fn is_complete(&self) -> Option<bool> {
        self.stream_len.map(|len| self.position >= len)
    }

    pub fn fraction(&self) -> Option<f64> {
        self.stream_len.map(|len| {
            if len == 0 {
                1.0
            } else {
                self.position as f64 / len as f64
            }
        })
    }
}

/// Reads the checkpoint log for a dump without touching the database.
pub fn status(dump: &Path, checkpoint: &Path) -> Result<ReplayStatus> {
    let position = recover_position(checkpoint)?;
    let stream_len = if source::Compression::from_path(dump).is_seekable() {
        let meta = std::fs::metadata(dump).map_err(ReplayError::io(format!(
            "failed to stat dump {}",
            dump.display()
        )))?;
        Some(meta.len())
    } else {
        None
    };

    Ok(ReplayStatus {
        checkpoint: checkpoint.to_path_buf(),
        position,
        stream_len,
    })
}
