//! `wikidex` builds and queries a term→article inverted index over a
//! MediaWiki-style XML dump.
//!
//! Building one splits the dump into N disjoint, `<title>`-aligned byte
//! regions (`region`) and hands each to an [`worker::IndexerWorker`] that
//! drives a [`stream::ByteStream`] through [`article::parse_article`],
//! tokenizes body text with `tokenizer`, and accumulates terms in a
//! [`write::IndexWriter`]. The `orchestrator` module spawns one worker per
//! region and reports aggregate progress until all of them finish.
//!
//! Querying loads one or more completed index files with
//! [`read::IndexReader`] (header resident in memory, body seeked on disk)
//! and fans a term across them with [`search::LoadedIndices`].

pub mod article;
pub mod error;
pub mod orchestrator;
pub mod read;
pub mod region;
pub mod search;
pub mod stream;
pub mod tokenizer;
pub mod worker;
pub mod write;

pub mod prelude {
    pub use crate::error::{BuildError, SearchError};
    pub use crate::orchestrator::build_index;
    pub use crate::read::{IndexReader, SearchResult};
    pub use crate::search::{LoadedIndices, MergedResult};
    pub use crate::write::IndexWriter;
}
