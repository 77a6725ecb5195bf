//! Spawns one [`IndexerWorker`] per region, reports aggregate progress once a
//! second, and joins everything at the end.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::BuildError;
use crate::region;
use crate::worker::IndexerWorker;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Build an index for `xml_path`, writing one numbered file per worker under
/// `out_basename` (`<out_basename>.1`, `.2`, …). `threads` overrides
/// auto-detected parallelism when `Some` and positive.
pub fn build_index<P: AsRef<Path>>(
    xml_path: P,
    out_basename: P,
    threads: Option<usize>,
) -> Result<(), BuildError> {
    let xml_path = xml_path.as_ref();
    let out_basename = out_basename.as_ref();
    let n = resolve_thread_count(threads);

    let regions = region::regionize(xml_path, n)?;
    tracing::info!(regions = regions.len(), "partitioned input file");

    let mut handles = Vec::with_capacity(regions.len());
    let mut progresses = Vec::with_capacity(regions.len());
    for (i, region) in regions.into_iter().enumerate() {
        let basename = worker_basename(out_basename, i + 1);
        let worker = IndexerWorker::new(xml_path, region, basename)?;
        progresses.push(worker.progress_handle());
        handles.push(
            thread::Builder::new()
                .name(format!("indexer-{}", i + 1))
                .spawn(move || worker.run())
                .map_err(BuildError::Io)?,
        );
    }

    loop {
        thread::sleep(PROGRESS_INTERVAL);
        let mut total = 0u64;
        let mut all_finished = true;
        for p in &progresses {
            let p = p.lock().unwrap();
            total += p.article_count;
            all_finished &= p.finished;
        }
        tracing::info!(articles_indexed = total, "indexing progress");
        if all_finished {
            break;
        }
    }

    let mut first_err = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(_) => {
                first_err.get_or_insert(BuildError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "indexer worker thread panicked",
                )));
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn worker_basename(out_basename: &Path, index: usize) -> PathBuf {
    let mut s = out_basename.as_os_str().to_owned();
    s.push(format!(".{index}"));
    PathBuf::from(s)
}

/// `threads` (an explicit `--threads` flag) wins; then the `THREADS`
/// environment variable if it parses as a positive integer; otherwise
/// `num_cpus::get()`. A non-numeric or non-positive `THREADS` falls back to
/// auto-detection rather than erroring, matching the original's tolerant
/// `atoi`-based parse.
fn resolve_thread_count(threads: Option<usize>) -> usize {
    if let Some(n) = threads {
        if n > 0 {
            return n;
        }
    }
    if let Ok(v) = std::env::var("THREADS") {
        if let Ok(n) = v.parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
    }
    num_cpus::get()
}
