//! Turn changed mapping documents into retag messages.
//!
//! Usage:
//!   git diff --name-only HEAD~1 | retag-plan --repo-root . --file-list files.txt
//!   retag-plan --changed-files changed.txt --dry-run
//!
//! Reads the changed repository paths (stdin unless --changed-files), keeps the
//! mapping documents among them, and prints one deposit message per archive
//! file of every declared dataset as NDJSON on stdout. --dry-run prints the
//! affected datasets instead.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dataset_mappings::retag::{DEFAULT_DOCUMENT_PREFIX, DEFAULT_ROUTING_KEY};
use dataset_mappings::{
    NdjsonPublisher, RetagPlanner, StaticFileLister, changed_documents, parse_changed_files,
    runtime,
};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "retag-plan")]
#[command(about = "Emit retag messages for datasets declared by changed mapping documents")]
struct Cli {
    /// Repository root the changed paths are relative to.
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,
    /// File listing changed paths, one per line; reads stdin when omitted.
    #[arg(long)]
    changed_files: Option<PathBuf>,
    /// Repository-relative directory holding mapping documents.
    #[arg(long, default_value = DEFAULT_DOCUMENT_PREFIX)]
    prefix: String,
    /// Archive file list (one path per line) used to enumerate dataset files.
    #[arg(long)]
    file_list: Option<PathBuf>,
    /// Routing key recorded for each published message.
    #[arg(long, default_value = DEFAULT_ROUTING_KEY)]
    routing_key: String,
    /// List affected datasets without emitting messages.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    runtime::init_tracing();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let listing = read_changed_listing(cli.changed_files.as_ref())?;
    let changed = parse_changed_files(&listing);
    let documents = changed_documents(&cli.repo_root, &changed, &cli.prefix)?;

    let lister = match &cli.file_list {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening file list {}", path.display()))?;
            StaticFileLister::from_reader(BufReader::new(file))?
        }
        None if cli.dry_run => StaticFileLister::default(),
        None => bail!("--file-list is required unless --dry-run is set"),
    };

    let planner = RetagPlanner::default()
        .with_routing_key(cli.routing_key)
        .dry_run(cli.dry_run);
    let mut publisher = NdjsonPublisher::new(io::stdout().lock());
    let summary = planner.run(&documents, &lister, &mut publisher)?;
    drop(publisher);

    if cli.dry_run {
        for document in &documents {
            println!("{}", document.path.display());
            for dataset in &document.datasets {
                println!("\t{dataset}");
            }
        }
    } else {
        eprintln!(
            "published {} messages for {} datasets",
            summary.messages,
            summary.datasets.len()
        );
    }
    Ok(())
}

fn read_changed_listing(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading changed paths from stdin")?;
            Ok(buf)
        }
    }
}
