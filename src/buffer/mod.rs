//! Growable byte buffer holding the unconsumed tail of the dump stream.
//!
//! The buffer is an arena with three cursors:
//!
//! ```text
//! 0        consumed        scanned            filled        capacity
//! |  free  |  unconsumed, scanned |  unscanned  |    free    |
//! ```
//!
//! - `consumed`: bytes before this were handed off and are free to discard.
//! - `scanned`: newline search has already looked at every byte before this.
//! - `filled`: bytes before this were read from the source.
//!
//! The scan cursor survives refills and compaction, so scanning a statement
//! that spans many reads is linear in its length.

use memchr::memchr;
use std::io::{self, Read};

/// Default initial capacity (1 MiB).
pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// Result of a [`StreamBuffer::fill`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// This many bytes were appended at the tail.
    Read(usize),
    /// The source is exhausted.
    EndOfStream,
}

/// A candidate line borrowed from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Unconsumed bytes up to, not including, the boundary newline. May span
    /// several physical lines.
    pub bytes: &'a [u8],
    /// Absolute stream offset of the first byte.
    pub start_position: u64,
    /// Absolute stream offset just past the boundary newline.
    pub end_position: u64,
}

#[derive(Debug)]
pub struct StreamBuffer {
    buf: Vec<u8>,
    consumed: usize,
    scanned: usize,
    filled: usize,
    /// Absolute stream offset of `buf[consumed]`.
    origin: u64,
    growth_events: usize,
}

impl StreamBuffer {
    /// Creates a buffer whose first byte corresponds to stream offset `origin`.
    pub fn new(capacity: usize, origin: u64) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            consumed: 0,
            scanned: 0,
            filled: 0,
            origin,
            growth_events: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the source but not yet consumed.
    pub fn residue(&self) -> usize {
        self.filled - self.consumed
    }

    /// Absolute stream offset of the first unconsumed byte.
    pub fn position(&self) -> u64 {
        self.origin
    }

    /// Number of times [`reclaim`](Self::reclaim) doubled the capacity.
    pub fn growth_events(&self) -> usize {
        self.growth_events
    }

    /// True when every byte read so far has been consumed.
    pub fn is_drained(&self) -> bool {
        self.consumed == self.filled
    }

    /// Checks `0 <= consumed <= scanned <= filled <= capacity`.
    pub fn invariants_hold(&self) -> bool {
        self.consumed <= self.scanned && self.scanned <= self.filled && self.filled <= self.buf.len()
    }

    /// Reads more bytes from `source` into the free tail.
    ///
    /// A full buffer is reclaimed first, so a call never reads into zero bytes
    /// of space (which would be indistinguishable from end of stream).
    pub fn fill<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<Fill> {
        if self.filled == self.buf.len() {
            self.reclaim();
        }

        loop {
            match source.read(&mut self.buf[self.filled..]) {
                Ok(0) => return Ok(Fill::EndOfStream),
                Ok(n) => {
                    self.filled += n;
                    return Ok(Fill::Read(n));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Finds the next newline at or after the scan cursor.
    ///
    /// On a hit the scan cursor moves past the newline and its buffer index is
    /// returned. On a miss the scan cursor moves to the end of the filled
    /// region so the same bytes are not searched again after the next fill.
    pub fn next_boundary(&mut self) -> Option<usize> {
        match memchr(b'\n', &self.buf[self.scanned..self.filled]) {
            Some(offset) => {
                let boundary = self.scanned + offset;
                self.scanned = boundary + 1;
                Some(boundary)
            }
            None => {
                self.scanned = self.filled;
                None
            }
        }
    }

    /// The unconsumed bytes ending at `boundary`, a newline index returned by
    /// [`next_boundary`](Self::next_boundary).
    pub fn candidate(&self, boundary: usize) -> Candidate<'_> {
        debug_assert!(self.consumed <= boundary && boundary < self.scanned);
        Candidate {
            bytes: &self.buf[self.consumed..boundary],
            start_position: self.origin,
            end_position: self.origin + (boundary + 1 - self.consumed) as u64,
        }
    }

    /// Marks every byte before `new_start` as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `new_start` lies before the consumed cursor or past the scan
    /// cursor: consuming unscanned bytes would skip statements.
    pub fn advance_consumed(&mut self, new_start: usize) {
        assert!(
            self.consumed <= new_start && new_start <= self.scanned,
            "advance_consumed({new_start}) outside {}..={}",
            self.consumed,
            self.scanned
        );
        self.origin += (new_start - self.consumed) as u64;
        self.consumed = new_start;
    }

    /// Frees the consumed prefix.
    ///
    /// If the residue takes more than half the capacity, the contents move to a
    /// new buffer of twice the size; otherwise they are compacted to the front
    /// of the current one. Either way at least half the resulting capacity is
    /// free afterwards.
    pub fn reclaim(&mut self) {
        let residue = self.residue();
        let capacity = self.buf.len();

        if residue > capacity / 2 {
            let mut grown = vec![0; capacity * 2];
            grown[..residue].copy_from_slice(&self.buf[self.consumed..self.filled]);
            self.buf = grown;
            self.growth_events += 1;
            tracing::debug!(
                from = capacity,
                to = capacity * 2,
                residue,
                "grew replay buffer"
            );
        } else {
            self.buf.copy_within(self.consumed..self.filled, 0);
        }

        self.scanned -= self.consumed;
        self.filled = residue;
        self.consumed = 0;
        debug_assert!(self.invariants_hold());
    }
}
