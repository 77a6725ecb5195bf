//! Fans a query out across every loaded index file and merges the weighted
//! results into one ranked top-K list.
//!
//! The distilled spec's "process-global reader list" becomes an explicit,
//! owned [`LoadedIndices`] value here — there is no global state to
//! initialize-then-race on, so the single-threaded-init discipline the
//! original relied on by convention is enforced by the type system instead.

use std::path::Path;

use crate::read::{IndexReader, SearchResult, MAX_SEARCH_RESULTS};

/// A query result merged across every successfully loaded index file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedResult {
    /// Sum of `total` across all loaded files.
    pub total: usize,
    /// Up to `MAX_SEARCH_RESULTS` `(title, weight)` pairs, sorted by weight
    /// descending, tie-broken by title ascending.
    pub top: Vec<(String, usize)>,
}

/// The set of index files currently open for querying.
pub struct LoadedIndices {
    readers: Vec<IndexReader>,
}

impl LoadedIndices {
    /// Open every path in `files`, skipping (and logging a warning for) any
    /// that fail to open or parse. Returns the loaded set and how many of
    /// `files` were actually loaded.
    pub fn load<P: AsRef<Path>>(files: &[P]) -> (LoadedIndices, usize) {
        let mut readers = Vec::with_capacity(files.len());
        for path in files {
            let path = path.as_ref();
            match IndexReader::open(path) {
                Ok(reader) => readers.push(reader),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable index file");
                }
            }
        }
        let loaded = readers.len();
        (LoadedIndices { readers }, loaded)
    }

    /// Number of index files currently loaded.
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Query every loaded index for `term` and merge the results.
    pub fn search(&self, term: &str) -> MergedResult {
        let mut total = 0usize;
        let mut merged: Vec<(String, usize)> = Vec::new();
        for reader in &self.readers {
            let SearchResult { total: file_total, top } = reader.search(term);
            total += file_total;
            for (title, weight) in top {
                match merged.iter_mut().find(|(t, _)| *t == title) {
                    Some((_, w)) => *w += weight,
                    None => merged.push((title, weight)),
                }
            }
        }
        merged.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        merged.truncate(MAX_SEARCH_RESULTS);
        MergedResult { total, top: merged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::IndexWriter;

    fn build(path: &Path, entries: &[(&str, &str, usize)]) {
        let mut w = IndexWriter::create(path).unwrap();
        for &(term, article, count) in entries {
            for _ in 0..count {
                w.index(term, article).unwrap();
            }
        }
        w.flush(true).unwrap();
    }

    #[test]
    fn merges_weights_across_two_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        build(&a, &[("poetry", "Art", 3)]);
        build(&b, &[("poetry", "Artistry", 1)]);

        let (indices, loaded) = LoadedIndices::load(&[&a, &b]);
        assert_eq!(loaded, 2);

        let result = indices.search("poetry");
        assert_eq!(result.total, 2);
        assert_eq!(
            result.top,
            vec![("Art".to_string(), 3), ("Artistry".to_string(), 1)]
        );
    }

    #[test]
    fn unreadable_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good");
        build(&good, &[("term", "Article", 1)]);
        let bad = dir.path().join("bad");
        std::fs::write(&bad, b"garbage").unwrap();

        let (indices, loaded) = LoadedIndices::load(&[&good, &bad]);
        assert_eq!(loaded, 1);
        assert_eq!(indices.len(), 1);
    }

    #[test]
    fn same_title_across_files_has_weights_summed() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        build(&a, &[("shared", "Same", 2)]);
        build(&b, &[("shared", "Same", 5)]);

        let (indices, _) = LoadedIndices::load(&[&a, &b]);
        let result = indices.search("shared");
        assert_eq!(result.top, vec![("Same".to_string(), 7)]);
    }
}
