//! Opening a dump positioned at a recovered checkpoint.
//!
//! Plain dumps are seeked directly. Compressed dumps cannot be seeked, so the
//! decoder is read and discarded up to the checkpoint; positions in the
//! checkpoint log are always offsets into the decompressed statement stream.

use crate::error::{ReplayError, Result};
use crate::progress::ProgressReader;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }

    /// Plain files map stream offsets to file offsets one to one.
    pub fn is_seekable(&self) -> bool {
        *self == Compression::None
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// A dump stream ready to be replayed from a given position.
pub struct DumpSource {
    pub reader: Box<dyn Read>,
    pub compression: Compression,
    /// Length of the statement stream, when known without decompressing.
    pub stream_len: Option<u64>,
}

/// Opens `path` and positions its statement stream at `position`.
///
/// `on_progress` receives absolute offsets into the file on disk as it is
/// read, which for compressed dumps differ from stream positions.
pub fn open_at<F>(path: &Path, position: u64, on_progress: Option<F>) -> Result<DumpSource>
where
    F: Fn(u64) + 'static,
{
    let mut file = File::open(path).map_err(ReplayError::io(format!(
        "failed to open dump {}",
        path.display()
    )))?;
    let file_size = file
        .metadata()
        .map_err(ReplayError::io(format!("failed to stat dump {}", path.display())))?
        .len();
    let compression = Compression::from_path(path);

    if compression.is_seekable() {
        if position > file_size {
            return Err(ReplayError::CheckpointBeyondEnd {
                position,
                length: file_size,
            });
        }
        if position != 0 {
            tracing::info!(position, dump = %path.display(), "seeking to checkpoint");
            file.seek(SeekFrom::Start(position))
                .map_err(ReplayError::io(format!("failed to seek dump {}", path.display())))?;
        }
        let reader: Box<dyn Read> = match on_progress {
            Some(cb) => Box::new(ProgressReader::new(file, position, cb)),
            None => Box::new(file),
        };
        return Ok(DumpSource {
            reader,
            compression,
            stream_len: Some(file_size),
        });
    }

    let raw: Box<dyn Read> = match on_progress {
        Some(cb) => Box::new(ProgressReader::new(file, 0, cb)),
        None => Box::new(file),
    };
    let mut reader = compression
        .wrap_reader(raw)
        .map_err(ReplayError::io(format!("failed to open {} decoder", compression)))?;

    if position != 0 {
        tracing::info!(position, dump = %path.display(), %compression, "skipping to checkpoint");
        let skipped = io::copy(&mut (&mut reader).take(position), &mut io::sink()).map_err(
            ReplayError::io(format!("failed to decompress dump {}", path.display())),
        )?;
        if skipped < position {
            return Err(ReplayError::CheckpointBeyondEnd {
                position,
                length: skipped,
            });
        }
    }

    Ok(DumpSource {
        reader,
        compression,
        stream_len: None,
    })
}
