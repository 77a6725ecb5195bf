//! CLI entry point for querying one or more index files interactively:
//! `reader <idx> [<idx>…]`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use wikidex::prelude::LoadedIndices;

/// Interactively query one or more term→article index files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Index files to load (as produced by `indexer`).
    index_files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.index_files.is_empty() {
        eprintln!("usage: reader <idx> [<idx>...]");
        return ExitCode::from(1);
    }

    let (indices, loaded) = LoadedIndices::load(&args.index_files);
    tracing::info!(loaded, requested = args.index_files.len(), "loaded index files");
    if indices.is_empty() {
        eprintln!("no index files could be loaded");
        return ExitCode::from(2);
    }

    run_prompt(&indices);
    ExitCode::SUCCESS
}

fn run_prompt(indices: &LoadedIndices) {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        line.clear();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let term = line.trim().to_lowercase();
        if term.is_empty() {
            continue;
        }
        if term == "quit" {
            break;
        }

        let result = indices.search(&term);
        if result.top.is_empty() {
            println!("no results for {term:?}");
            continue;
        }
        for (title, weight) in &result.top {
            println!("{title} ({weight})");
        }
    }
}
