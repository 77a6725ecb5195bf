//! Drives a [`ByteStream`] through one `<title>…<contributor>…<text>…</text>`
//! article, handing the captured spans off to the tokenizer and the index
//! writer.
//!
//! This is the Rust counterpart of the original's `index_article`: a fixed
//! sequence of `read_until` calls, each with its own consume/capture policy,
//! ending in either a fully indexed article, a structurally malformed one
//! that the worker should skip, or the end of the owning region.

use crate::error::{BufferKind, BuildError};
use crate::stream::ByteStream;
use crate::tokenizer::{self, END_DELIM};
use crate::write::IndexWriter;

const TITLE_OPEN: &[u8] = b"<title>";
const TITLE_CLOSE: &[u8] = b"<";
const CONTRIBUTOR_OPEN: &[u8] = b"<contributor>";
const CONTRIBUTOR_CLOSE: &[u8] = b"</contributor>";
const TEXT_OPEN: &[u8] = b"<text";
const TAG_CLOSE: &[u8] = b">";
const TEXT_CLOSE: &[u8] = b"</text";
const USERNAME_OPEN: &[u8] = b"<username>";
const USERNAME_CLOSE: &[u8] = b"</username>";

const MAX_TITLE_BYTES: usize = 1024;
const MAX_CONTRIBUTOR_BYTES: usize = 1024 * 1024;
const MAX_TEXT_BYTES: usize = 100 * 1024 * 1024;

const SKIPPED_PREFIXES: &[&str] = &["Category:", "Wikipedia:", "Special:"];

/// Result of attempting to parse one article out of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// The article was indexed; the worker should count it and continue.
    Indexed,
    /// The article was structurally malformed, or benignly excluded (empty
    /// or special-namespace title); the worker should continue to the next
    /// one without counting it.
    Skipped,
    /// The stream's region is exhausted; no `<title>` remains.
    EndOfRegion,
}

/// Parse and index the next article in `stream`, writing terms through
/// `writer`.
pub fn parse_article(
    stream: &mut ByteStream,
    writer: &mut IndexWriter,
) -> Result<ArticleOutcome, BuildError> {
    if !stream.read_until(TITLE_OPEN, true, |_| {})? {
        return Ok(ArticleOutcome::EndOfRegion);
    }

    let mut title_buf = Vec::new();
    if !stream.read_until(TITLE_CLOSE, false, |buf| title_buf = buf.to_vec())? {
        return Ok(ArticleOutcome::Skipped);
    }
    if title_buf.len() > MAX_TITLE_BYTES {
        return Err(BuildError::BufferTooLarge {
            kind: BufferKind::Title,
            len: title_buf.len(),
            limit: MAX_TITLE_BYTES,
        });
    }
    let title = sanitize_title(&title_buf);
    if title.is_empty() || SKIPPED_PREFIXES.iter().any(|p| title.starts_with(p)) {
        return Ok(ArticleOutcome::Skipped);
    }

    if !stream.read_until(CONTRIBUTOR_OPEN, true, |_| {})? {
        return Ok(ArticleOutcome::Skipped);
    }
    let mut contributor_buf = Vec::new();
    if !stream.read_until(CONTRIBUTOR_CLOSE, false, |buf| contributor_buf = buf.to_vec())? {
        return Ok(ArticleOutcome::Skipped);
    }
    if contributor_buf.len() > MAX_CONTRIBUTOR_BYTES {
        return Err(BuildError::BufferTooLarge {
            kind: BufferKind::Contributor,
            len: contributor_buf.len(),
            limit: MAX_CONTRIBUTOR_BYTES,
        });
    }
    let contributor = sanitize_contributor(&contributor_buf);

    if !stream.read_until(TEXT_OPEN, true, |_| {})? {
        return Ok(ArticleOutcome::Skipped);
    }
    if !stream.read_until(TAG_CLOSE, true, |_| {})? {
        return Ok(ArticleOutcome::Skipped);
    }

    let mut text_buf = Vec::new();
    if !stream.read_until(TEXT_CLOSE, false, |buf| text_buf = buf.to_vec())? {
        return Ok(ArticleOutcome::Skipped);
    }
    if text_buf.len() > MAX_TEXT_BYTES {
        return Err(BuildError::BufferTooLarge {
            kind: BufferKind::Text,
            len: text_buf.len(),
            limit: MAX_TEXT_BYTES,
        });
    }

    if !contributor.is_empty() {
        writer.index(&contributor, &title)?;
    }
    let mut index_err = None;
    tokenizer::tokenize(&text_buf, |term| {
        if index_err.is_none() {
            if let Err(e) = writer.index(term, &title) {
                index_err = Some(e);
            }
        }
    });
    if let Some(e) = index_err {
        return Err(e);
    }

    Ok(ArticleOutcome::Indexed)
}

/// Strip any stray `END_DELIM` bytes and decode as UTF-8, lossily — titles
/// come straight from the dump and are not guaranteed well-formed.
fn sanitize_title(raw: &[u8]) -> String {
    let cleaned: Vec<u8> = raw.iter().copied().filter(|&b| b != END_DELIM).collect();
    String::from_utf8_lossy(&cleaned).into_owned()
}

/// Pull the `<username>…</username>` payload out of a captured `<contributor>`
/// block, or the empty string if there is none (anonymous edits give an IP
/// inside `<ip>`, which this crate does not index).
fn sanitize_contributor(raw: &[u8]) -> String {
    let open = match find(raw, USERNAME_OPEN) {
        Some(i) => i + USERNAME_OPEN.len(),
        None => return String::new(),
    };
    let close = match find(&raw[open..], USERNAME_CLOSE) {
        Some(i) => open + i,
        None => return String::new(),
    };
    String::from_utf8_lossy(&raw[open..close]).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
