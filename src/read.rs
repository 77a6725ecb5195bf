//! Parses a completed index file's header into memory and answers
//! single-term queries by seeking into the body on disk.
//!
//! The header (article table + term table) is small relative to the body and
//! is kept resident for the reader's lifetime; the body is only ever touched
//! through seeks driven by the header's offset lists. See `crate::write` for
//! the mirrored on-disk layout this module parses.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::SearchError;
use crate::tokenizer::END_DELIM;

/// Fixed size of the top-K result list returned by `search` and by the
/// aggregator's merge.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// The result of querying one term against one loaded index file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Number of distinct articles the term occurs in.
    pub total: usize,
    /// Up to `MAX_SEARCH_RESULTS` `(title, weight)` pairs, in ascending
    /// article-id order.
    pub top: Vec<(String, usize)>,
}

/// An index file's header, loaded into memory, plus a seekable handle onto
/// its body.
pub struct IndexReader {
    titles: HashMap<u32, String>,
    term_offsets: HashMap<String, Vec<u64>>,
    file: RefCell<File>,
}

impl IndexReader {
    /// Parse `path`'s header. Fails with [`SearchError`] on any structural
    /// problem; the aggregator treats that as "omit this file", not as a
    /// fatal condition.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<IndexReader, SearchError> {
        let file = File::open(path)?;
        let mut r = BufReader::new(file);
        let mut pos: u64 = 0;

        let body_offset = read_u32_line(&mut r, &mut pos)?;

        let article_count = read_u32_line(&mut r, &mut pos)?;
        let mut titles = HashMap::with_capacity(article_count as usize);
        for _ in 0..article_count {
            let aid = read_u32(&mut r, &mut pos)?;
            let title = read_line_bytes(&mut r, &mut pos)?;
            let title = String::from_utf8(title).map_err(|_| SearchError::MalformedHeader {
                offset: pos,
                reason: "article title is not valid utf-8",
            })?;
            titles.insert(aid, title);
        }

        let term_count = read_u32_line(&mut r, &mut pos)?;
        let mut term_offsets: HashMap<String, Vec<u64>> = HashMap::with_capacity(term_count as usize);
        for _ in 0..term_count {
            let _tid = read_u32(&mut r, &mut pos)?;
            let term_bytes = read_until_byte(&mut r, &mut pos, END_DELIM)?;
            let term = String::from_utf8(term_bytes).map_err(|_| SearchError::MalformedHeader {
                offset: pos,
                reason: "term is not valid utf-8",
            })?;

            let mut offsets = Vec::new();
            loop {
                let v = read_u32(&mut r, &mut pos)?;
                if v == u32::MAX {
                    break;
                }
                offsets.push(body_offset as u64 + v as u64);
            }
            expect_byte(&mut r, &mut pos, b'\n')?;

            term_offsets.entry(term).or_default().extend(offsets);
        }

        Ok(IndexReader {
            titles,
            term_offsets,
            file: RefCell::new(r.into_inner()),
        })
    }

    /// Look up `term`, aggregate occurrences per article across every body
    /// record the header points at, and return the top results.
    pub fn search(&self, term: &str) -> SearchResult {
        let offsets = match self.term_offsets.get(term) {
            Some(o) => o,
            None => return SearchResult::default(),
        };

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        let mut file = self.file.borrow_mut();
        for &offset in offsets {
            if let Err(e) = read_body_record(&mut file, offset, &mut counts) {
                tracing::warn!(term, offset, error = %e, "skipping unreadable body record");
            }
        }

        let total = counts.len();
        let top = counts
            .iter()
            .take(MAX_SEARCH_RESULTS)
            .filter_map(|(aid, &weight)| self.titles.get(aid).map(|t| (t.clone(), weight)))
            .collect();
        SearchResult { total, top }
    }
}

fn read_body_record(file: &mut File, offset: u64, counts: &mut BTreeMap<u32, usize>) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    let _tid = file.read_u32::<LittleEndian>()?;
    loop {
        let aid = file.read_u32::<LittleEndian>()?;
        if aid == u32::MAX {
            break;
        }
        *counts.entry(aid).or_insert(0) += 1;
    }
    let mut nl = [0u8; 1];
    file.read_exact(&mut nl)?;
    Ok(())
}

fn read_u32<R: Read>(r: &mut R, pos: &mut u64) -> Result<u32, SearchError> {
    let v = r.read_u32::<LittleEndian>()?;
    *pos += 4;
    Ok(v)
}

fn read_u32_line<R: Read>(r: &mut R, pos: &mut u64) -> Result<u32, SearchError> {
    let v = read_u32(r, pos)?;
    expect_byte(r, pos, b'\n')?;
    Ok(v)
}

fn expect_byte<R: Read>(r: &mut R, pos: &mut u64, want: u8) -> Result<(), SearchError> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    *pos += 1;
    if b[0] != want {
        return Err(SearchError::MalformedHeader {
            offset: *pos,
            reason: "unexpected byte where a fixed delimiter was expected",
        });
    }
    Ok(())
}

/// Read bytes up to (not including) the next `'\n'`, consuming it.
fn read_line_bytes<R: BufRead>(r: &mut R, pos: &mut u64) -> Result<Vec<u8>, SearchError> {
    let mut line = Vec::new();
    let n = r.read_until(b'\n', &mut line)?;
    if n == 0 || line.last() != Some(&b'\n') {
        return Err(SearchError::MalformedHeader {
            offset: *pos,
            reason: "header record truncated before newline",
        });
    }
    line.pop();
    *pos += n as u64;
    Ok(line)
}

/// Read bytes up to (not including) the next occurrence of `delim`,
/// consuming it.
fn read_until_byte<R: Read>(r: &mut R, pos: &mut u64, delim: u8) -> Result<Vec<u8>, SearchError> {
    let mut out = Vec::new();
    loop {
        let mut b = [0u8; 1];
        r.read_exact(&mut b)?;
        *pos += 1;
        if b[0] == delim {
            break;
        }
        out.push(b[0]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::IndexWriter;

    #[test]
    fn round_trips_a_simple_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        w.index("poetry", "Art").unwrap();
        w.index("poetry", "Art").unwrap();
        w.index("poetry", "Art").unwrap();
        w.index("canvas", "Art").unwrap();
        w.flush(true).unwrap();

        let r = IndexReader::open(&path).unwrap();
        let result = r.search("poetry");
        assert_eq!(result.total, 1);
        assert_eq!(result.top, vec![("Art".to_string(), 3)]);

        assert_eq!(r.search("nonexistent"), SearchResult::default());
    }

    #[test]
    fn open_rejects_a_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        std::fs::write(&path, b"not an index file at all, much too short").unwrap();
        assert!(IndexReader::open(&path).is_err());
    }

    #[test]
    fn top_k_is_ascending_by_article_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        // "Zed" interned first -> lower article id than "Ant", despite the
        // title sort order; top-K must reflect interning (id) order.
        w.index("shared", "Zed").unwrap();
        w.index("shared", "Ant").unwrap();
        w.flush(true).unwrap();

        let r = IndexReader::open(&path).unwrap();
        let result = r.search("shared");
        assert_eq!(result.top, vec![("Zed".to_string(), 1), ("Ant".to_string(), 1)]);
    }
}
