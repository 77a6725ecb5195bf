//! Owns one region of the dump and one [`IndexWriter`]; indexes articles
//! until the region is exhausted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::article::{self, ArticleOutcome};
use crate::error::BuildError;
use crate::stream::{ByteStream, Region};
use crate::write::IndexWriter;

/// Whole-index flush threshold: the worker flushes and starts a fresh
/// generation of its writer every time this many articles have been indexed
/// since the last flush.
pub const ARTICLE_FLUSH_LIMIT: u32 = 100_000;

/// Counters the orchestrator polls while a worker runs on its own thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerProgress {
    /// Total articles indexed so far (across all flush generations).
    pub article_count: u64,
    pub finished: bool,
}

/// One indexer worker: a region-bounded stream paired with a writer.
pub struct IndexerWorker {
    stream: ByteStream,
    writer: IndexWriter,
    progress: Arc<Mutex<WorkerProgress>>,
    stop: Arc<AtomicBool>,
}

impl IndexerWorker {
    pub fn new<P: AsRef<Path>>(
        xml_path: P,
        region: Region,
        basename: PathBuf,
    ) -> Result<IndexerWorker, BuildError> {
        let stream = ByteStream::open(xml_path, region)?;
        let writer = IndexWriter::create(basename)?;
        Ok(IndexerWorker {
            stream,
            writer,
            progress: Arc::new(Mutex::new(WorkerProgress::default())),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A handle the orchestrator can poll from another thread while `run`
    /// executes.
    pub fn progress_handle(&self) -> Arc<Mutex<WorkerProgress>> {
        Arc::clone(&self.progress)
    }

    /// A handle the orchestrator can use to request cooperative shutdown.
    /// Checked at article granularity; in-flight I/O is never interrupted.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Index articles until the region is exhausted (or `stop` is set),
    /// whole-flushing every `ARTICLE_FLUSH_LIMIT` articles and once more at
    /// the end.
    pub fn run(mut self) -> Result<(), BuildError> {
        let mut unflushed: u32 = 0;
        let mut total: u64 = 0;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            match article::parse_article(&mut self.stream, &mut self.writer)? {
                ArticleOutcome::Indexed => {
                    unflushed += 1;
                    total += 1;
                    self.progress.lock().unwrap().article_count = total;
                    if unflushed >= ARTICLE_FLUSH_LIMIT {
                        self.writer.flush(false)?;
                        unflushed = 0;
                    }
                }
                ArticleOutcome::Skipped => {
                    tracing::debug!("skipped a malformed or excluded article");
                    continue;
                }
                ArticleOutcome::EndOfRegion => {
                    self.writer.flush(true)?;
                    break;
                }
            }
        }
        self.progress.lock().unwrap().finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::IndexReader;
    use std::path::PathBuf;

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/short.xml")
    }

    #[test]
    fn indexes_a_whole_region_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("idx.1");
        let worker = IndexerWorker::new(fixture(), Region::new(0, 0), basename.clone()).unwrap();
        let progress = worker.progress_handle();
        worker.run().unwrap();

        let p = progress.lock().unwrap();
        assert_eq!(p.article_count, 5);
        assert!(p.finished);

        let reader = IndexReader::open(&basename).unwrap();
        assert_eq!(reader.search("poetry").top, vec![("Art".to_string(), 19)]);
    }
}
