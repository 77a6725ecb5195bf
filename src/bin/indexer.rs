//! CLI entry point for building an index: `indexer <xml-path> <index-basename> [--threads N]`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use wikidex::prelude::build_index;

/// Build a term→article inverted index from a MediaWiki XML dump.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the MediaWiki XML dump to index.
    xml_path: PathBuf,

    /// Basename for the output index files; worker `i` writes
    /// `<index_basename>.<i>` (and `.<i>.2`, `.<i>.3`, … for workers that
    /// cross the whole-flush article threshold).
    index_basename: PathBuf,

    /// Number of worker threads. Defaults to the `THREADS` environment
    /// variable if set to a positive integer, else the detected CPU count.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match build_index(&args.xml_path, &args.index_basename, args.threads) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "indexing failed");
            ExitCode::from(2)
        }
    }
}
