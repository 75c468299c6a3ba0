//! Byte-counting reader used to drive the replay progress bar.

use std::io::Read;

/// Wraps the raw dump file and reports how far into it reading has got.
///
/// The count starts at `base`, the file offset the reader was positioned at,
/// so a resumed replay reports absolute offsets rather than bytes read since
/// the restart. For compressed dumps this counts compressed bytes.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    offset: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new<F>(reader: R, base: u64, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            offset: base,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.offset += n as u64;
        (self.callback)(self.offset);
        Ok(n)
    }
}
