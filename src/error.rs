//! Typed errors for the build and search sides of the crate.
//!
//! The original indexer treated every failure condition as either an
//! `assert()`, an abort, or a silently-swallowed `std::runtime_error` at an
//! ad hoc call site. These enums make that taxonomy explicit: a
//! [`BuildError`] always means the worker that hit it cannot continue, and a
//! [`SearchError`] always means one index file was skipped, not that the
//! query itself failed.

use std::path::PathBuf;

/// The kind of oversize buffer rejected during article parsing (§4.3 bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Title,
    Contributor,
    Text,
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BufferKind::Title => "title",
            BufferKind::Contributor => "contributor",
            BufferKind::Text => "text",
        };
        f.write_str(s)
    }
}

/// Fatal errors that abort the worker that raised them and surface to the
/// orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("term/article ID space exhausted (hit u32::MAX)")]
    IdSpaceExhausted,

    #[error("{kind} buffer too large: {len} bytes (limit {limit})")]
    BufferTooLarge {
        kind: BufferKind,
        len: usize,
        limit: usize,
    },

    #[error("region count {count} out of range (1..=64)")]
    InvalidRegionCount { count: usize },

    #[error("body offset {offset} does not fit in a u32")]
    BodyTooLarge { offset: u64 },

    #[error("fewer <title> boundaries than requested regions in {path}")]
    NotEnoughRegions { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors that cause `IndexReader::open` to reject a single index file. The
/// aggregator turns these into a logged warning and an omission from its
/// loaded set; they never propagate past `search::load_indices`.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("malformed index header at byte {offset}: {reason}")]
    MalformedHeader { offset: u64, reason: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
