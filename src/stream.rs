//! A bounded byte-stream reader over one region of a file.
//!
//! This is the Rust counterpart of the original's `xstream`: a cursor over
//! `[begin, end)` of a single file, with a `read_until` primitive that scans
//! forward for a literal token and hands the skipped-over bytes to a
//! callback. The original also had a second, near-identical stream type used
//! by an alternate (never-finished) indexer path; this crate collapses both
//! into the one type below, per the redesign note in the distilled spec.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A half-open byte range `[begin, end)` within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub begin: u64,
    pub end: u64,
}

impl Region {
    pub fn new(begin: u64, end: u64) -> Region {
        Region { begin, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

/// A cursor over one region of a file, supporting forward scans for a
/// literal token.
///
/// Not thread-safe, and not meant to be: each indexer worker owns exactly
/// one `ByteStream`.
pub struct ByteStream {
    file: File,
    region: Region,
    finished: bool,
}

impl ByteStream {
    /// Open `path` and position the cursor at `region.begin`. `region.end ==
    /// 0` means "end of file" and is resolved to the file's actual size.
    pub fn open<P: AsRef<Path>>(path: P, mut region: Region) -> io::Result<ByteStream> {
        let mut file = File::open(path)?;
        let size = file.seek(SeekFrom::End(0))?;
        if region.end == 0 {
            region.end = size;
        }
        file.seek(SeekFrom::Start(region.begin))?;
        Ok(ByteStream {
            file,
            region,
            finished: region.begin >= region.end,
        })
    }

    /// Current cursor position, absolute within the file.
    pub fn tell(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    /// Move the cursor to `pos`. Fails if `pos` falls outside the region.
    pub fn seek(&mut self, pos: u64) -> io::Result<bool> {
        if pos < self.region.begin || pos > self.region.end {
            return Ok(false);
        }
        self.file.seek(SeekFrom::Start(pos))?;
        self.finished = pos >= self.region.end;
        Ok(true)
    }

    /// Length of this stream's region, in bytes.
    pub fn size(&self) -> u64 {
        self.region.len()
    }

    /// Read `n` bytes starting at the cursor, without moving it.
    pub fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let start = self.tell()?;
        let mut buf = vec![0u8; n];
        self.file.read_exact(&mut buf)?;
        self.file.seek(SeekFrom::Start(start))?;
        Ok(buf)
    }

    /// Scan forward for the next occurrence of `tok`.
    ///
    /// On a match that starts before `self.region.end`: positions the cursor
    /// at the start of the match (or just past it, if `consume`), calls
    /// `capture` with the bytes strictly between the original cursor and the
    /// match start, and returns `Ok(true)`.
    ///
    /// On reaching `self.region.end` without a match: positions the cursor
    /// at `self.region.end`, marks the stream finished, and returns
    /// `Ok(false)` without invoking `capture`.
    ///
    /// Once finished, further calls return `Ok(false)` immediately with no
    /// I/O.
    ///
    /// Scans in fixed-size chunks rather than slurping the whole remainder
    /// of the region, so a miss doesn't cost more than the distance to the
    /// next match (or to `region.end`).
    pub fn read_until<F>(&mut self, tok: &[u8], consume: bool, mut capture: F) -> io::Result<bool>
    where
        F: FnMut(&[u8]),
    {
        const CHUNK: usize = 64 * 1024;
        if self.finished {
            return Ok(false);
        }
        let start = self.tell()?;
        let region_end = self.region.end;
        let mut acc: Vec<u8> = Vec::new();
        let mut chunk = vec![0u8; CHUNK];

        loop {
            let pos = self.tell()?;
            if pos >= region_end {
                self.finished = true;
                return Ok(false);
            }
            let want = (CHUNK as u64).min(region_end - pos) as usize;
            let read = self.fill_up_to(&mut chunk[..want])?;
            if read == 0 {
                self.finished = true;
                return Ok(false);
            }
            acc.extend_from_slice(&chunk[..read]);

            // Only re-scan the new bytes plus enough overlap to catch a
            // match straddling the chunk boundary.
            let scan_from = acc.len().saturating_sub(read + tok.len().saturating_sub(1));
            if let Some(rel_start) = find_subslice(&acc[scan_from..], tok) {
                let match_start = scan_from + rel_start;
                let match_end = match_start + tok.len();
                capture(&acc[..match_start]);
                let cursor = start + if consume { match_end as u64 } else { match_start as u64 };
                self.file.seek(SeekFrom::Start(cursor))?;
                self.finished = cursor >= region_end;
                return Ok(true);
            }
        }
    }

    /// Fill `buf` completely from the current position, stopping early
    /// (short read) only at true end of file.
    fn fill_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..])? {
                0 => break,
                n => total += n,
            }
        }
        Ok(total)
    }
}

/// Forward substring search over raw bytes (not token-aware; no
/// consideration of overlapping matches, since we only ever need the first
/// one from the cursor).
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_does_not_advance_cursor() {
        let f = write_fixture(b"hello world");
        let mut s = ByteStream::open(f.path(), Region::new(0, 0)).unwrap();
        assert_eq!(s.read(5).unwrap(), b"hello");
        assert_eq!(s.read(5).unwrap(), b"hello");
    }

    #[test]
    fn read_until_finds_token_and_captures_prefix() {
        let f = write_fixture(b"abc<title>def");
        let mut s = ByteStream::open(f.path(), Region::new(0, 0)).unwrap();
        let mut captured = Vec::new();
        let found = s
            .read_until(b"<title>", true, |buf| captured = buf.to_vec())
            .unwrap();
        assert!(found);
        assert_eq!(captured, b"abc");
        assert_eq!(s.tell().unwrap(), 10);
    }

    #[test]
    fn read_until_without_consume_stops_before_token() {
        let f = write_fixture(b"abc<title>def");
        let mut s = ByteStream::open(f.path(), Region::new(0, 0)).unwrap();
        s.read_until(b"<title>", false, |_| {}).unwrap();
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn read_until_past_region_end_fails_and_finishes() {
        let f = write_fixture(b"abc<title>def");
        let mut s = ByteStream::open(f.path(), Region::new(0, 5)).unwrap();
        let found = s.read_until(b"<title>", true, |_| {}).unwrap();
        assert!(!found);
        assert_eq!(s.tell().unwrap(), 5);
        // the stream stays finished, and further scans are free no-ops
        let found_again = s.read_until(b"<title>", true, |_| {}).unwrap();
        assert!(!found_again);
    }
}
