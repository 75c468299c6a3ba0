//! Unit and property tests for the stream buffer.

use proptest::prelude::*;
use sql_replayer::buffer::{Fill, StreamBuffer};

/// Reads at most `chunk` bytes per call.
struct Chunked<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl std::io::Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Drains `data` through a buffer, consuming every line, and returns the lines
/// with their end positions.
fn collect_lines(data: &[u8], capacity: usize, chunk: usize) -> (Vec<(Vec<u8>, u64)>, StreamBuffer) {
    let mut source = Chunked { data, chunk };
    let mut buf = StreamBuffer::new(capacity, 0);
    let mut lines = Vec::new();

    loop {
        while let Some(boundary) = buf.next_boundary() {
            let candidate = buf.candidate(boundary);
            lines.push((candidate.bytes.to_vec(), candidate.end_position));
            buf.advance_consumed(boundary + 1);
            assert!(buf.invariants_hold());
        }
        buf.reclaim();
        assert!(buf.invariants_hold());
        if buf.fill(&mut source).unwrap() == Fill::EndOfStream {
            break;
        }
    }

    (lines, buf)
}

#[test]
fn test_fill_and_find_boundaries() {
    let mut buf = StreamBuffer::new(64, 0);
    let mut src: &[u8] = b"SELECT 1;\nSELECT 2;\n";

    assert_eq!(buf.fill(&mut src).unwrap(), Fill::Read(20));
    let first = buf.next_boundary().unwrap();
    assert_eq!(first, 9);

    let candidate = buf.candidate(first);
    assert_eq!(candidate.bytes, b"SELECT 1;");
    assert_eq!(candidate.start_position, 0);
    assert_eq!(candidate.end_position, 10);

    buf.advance_consumed(first + 1);
    assert_eq!(buf.position(), 10);

    let second = buf.next_boundary().unwrap();
    assert_eq!(buf.candidate(second).bytes, b"SELECT 2;");
    buf.advance_consumed(second + 1);

    assert!(buf.is_drained());
    assert_eq!(buf.next_boundary(), None);
    assert_eq!(buf.fill(&mut src).unwrap(), Fill::EndOfStream);
}

#[test]
fn test_candidate_spans_lines_until_consumed() {
    let mut buf = StreamBuffer::new(64, 100);
    let mut src: &[u8] = b"INSERT INTO t\nVALUES (1);\n";
    buf.fill(&mut src).unwrap();

    let first = buf.next_boundary().unwrap();
    assert_eq!(buf.candidate(first).bytes, b"INSERT INTO t");

    // Not consumed: the next candidate extends the previous one.
    let second = buf.next_boundary().unwrap();
    let candidate = buf.candidate(second);
    assert_eq!(candidate.bytes, b"INSERT INTO t\nVALUES (1);");
    assert_eq!(candidate.start_position, 100);
    assert_eq!(candidate.end_position, 126);
}

#[test]
fn test_reclaim_grows_when_residue_exceeds_half() {
    let mut buf = StreamBuffer::new(8, 0);
    let mut src: &[u8] = b"abcdefgh";
    buf.fill(&mut src).unwrap();
    assert_eq!(buf.next_boundary(), None);

    buf.reclaim();
    assert_eq!(buf.capacity(), 16);
    assert_eq!(buf.growth_events(), 1);
    assert_eq!(buf.residue(), 8);
    assert!(buf.invariants_hold());
}

#[test]
fn test_reclaim_keeps_partial_scan_progress() {
    let mut buf = StreamBuffer::new(8, 0);
    let mut src: &[u8] = b"abcd\nefg\n";
    assert_eq!(buf.fill(&mut src).unwrap(), Fill::Read(8));

    let boundary = buf.next_boundary().unwrap();
    buf.advance_consumed(boundary + 1);
    assert_eq!(buf.next_boundary(), None);

    buf.reclaim();
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.fill(&mut src).unwrap(), Fill::Read(1));

    let boundary = buf.next_boundary().unwrap();
    assert_eq!(boundary, 3);
    let candidate = buf.candidate(boundary);
    assert_eq!(candidate.bytes, b"efg");
    assert_eq!(candidate.start_position, 5);
    assert_eq!(candidate.end_position, 9);
}

#[test]
fn test_fill_on_full_buffer_makes_room() {
    let mut buf = StreamBuffer::new(4, 0);
    let mut src: &[u8] = b"abcdefgh";
    assert_eq!(buf.fill(&mut src).unwrap(), Fill::Read(4));
    assert_eq!(buf.fill(&mut src).unwrap(), Fill::Read(4));
    assert_eq!(buf.capacity(), 8);
}

#[test]
#[should_panic]
fn test_advance_past_scan_cursor_panics() {
    let mut buf = StreamBuffer::new(16, 0);
    let mut src: &[u8] = b"abc\ndef\n";
    buf.fill(&mut src).unwrap();
    buf.advance_consumed(6);
}

#[test]
fn test_long_line_grows_buffer_repeatedly() {
    let mut data = vec![b'x'; 1000];
    data.push(b'\n');
    let (lines, buf) = collect_lines(&data, 16, 7);

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].0, vec![b'x'; 1000]);
    assert_eq!(lines[0].1, 1001);
    assert!(buf.growth_events() >= 6);
}

proptest! {
    #[test]
    fn prop_lines_match_split(
        lines in prop::collection::vec(prop::collection::vec(any::<u8>().prop_filter("no newline", |b| *b != b'\n'), 0..40), 0..30),
        capacity in 1usize..64,
        chunk in 1usize..32,
    ) {
        let mut data = Vec::new();
        for line in &lines {
            data.extend_from_slice(line);
            data.push(b'\n');
        }

        let (got, buf) = collect_lines(&data, capacity, chunk);

        prop_assert!(buf.is_drained());
        prop_assert_eq!(buf.position(), data.len() as u64);
        prop_assert_eq!(got.len(), lines.len());

        let mut end = 0u64;
        for ((bytes, position), expected) in got.iter().zip(lines.iter()) {
            end += expected.len() as u64 + 1;
            prop_assert_eq!(bytes, expected);
            prop_assert_eq!(*position, end);
        }
    }

    #[test]
    fn prop_capacity_never_shrinks(
        data in prop::collection::vec(any::<u8>(), 0..400),
        capacity in 1usize..32,
    ) {
        let mut source: &[u8] = &data;
        let mut buf = StreamBuffer::new(capacity, 0);
        let mut last_capacity = buf.capacity();

        loop {
            while let Some(boundary) = buf.next_boundary() {
                buf.advance_consumed(boundary + 1);
            }
            buf.reclaim();
            prop_assert!(buf.capacity() >= last_capacity);
            prop_assert!(buf.invariants_hold());
            prop_assert!(buf.capacity() - buf.residue() >= buf.capacity() / 2);
            last_capacity = buf.capacity();
            if buf.fill(&mut source).unwrap() == Fill::EndOfStream {
                break;
            }
        }
    }
}
