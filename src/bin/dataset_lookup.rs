//! Resolve archive paths against the mapping documents.
//!
//! Usage:
//!   dataset-lookup /neodc/esacci/sst/data/file.nc
//!   dataset-lookup --dir json --attribute "SST,SSS" /neodc/.../file.nc
//!   dataset-lookup --documents a.json,b.json --report
//!
//! Prints one JSON object per path with the resolved dataset, both
//! realisation answers and the dataset's mapping sections.

use anyhow::{Result, bail};
use clap::Parser;
use dataset_mappings::{DatasetCatalog, DocumentSource, runtime, split_list};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dataset-lookup")]
#[command(about = "Resolve archive paths to datasets and print their mapping configuration")]
struct Cli {
    /// Directory of mapping documents (defaults to DATASET_MAPPINGS_DIR or the bundled json/).
    #[arg(long, conflicts_with = "documents")]
    dir: Option<PathBuf>,
    /// Explicit mapping documents, comma separated or repeated.
    #[arg(long)]
    documents: Vec<String>,
    /// Attributes to pass through the dataset's merged mapping.
    #[arg(long)]
    attribute: Vec<String>,
    /// Print the bootstrap report (documents read, skipped, overlaps).
    #[arg(long)]
    report: bool,
    /// Archive paths to resolve.
    paths: Vec<String>,
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
    if cli.paths.is_empty() && !cli.report {
        bail!("nothing to do: pass one or more paths or --report");
    }

    let catalog = DatasetCatalog::bootstrap(&document_source(&cli))?;

    if cli.report {
        println!("{}", serde_json::to_string(catalog.report())?);
    }

    for path in &cli.paths {
        println!("{}", serde_json::to_string(&describe(&catalog, path, &cli.attribute)?)?);
    }
    Ok(())
}

fn document_source(cli: &Cli) -> DocumentSource {
    let documents: Vec<String> = cli.documents.iter().flat_map(|raw| split_list(raw)).collect();
    if !documents.is_empty() {
        return DocumentSource::files(documents);
    }
    match &cli.dir {
        Some(dir) => DocumentSource::Directory(dir.clone()),
        None => DocumentSource::DefaultDirectory,
    }
}

fn describe(catalog: &DatasetCatalog, path: &str, attributes: &[String]) -> Result<Value> {
    let dataset = catalog.resolve_dataset(path);
    let mut merged = Map::new();
    for attribute in attributes {
        let resolved = catalog.merged_attribute(&dataset, attribute)?;
        merged.insert(attribute.clone(), Value::String(resolved));
    }

    Ok(json!({
        "path": path,
        "dataset": dataset,
        "document": catalog.location(&dataset).map(|p| p.display().to_string()),
        "realisation": catalog.resolve_realisation(&dataset, path)?,
        "dataset_realisation": catalog.dataset_realisation(&dataset),
        "mappings": catalog.mapping(&dataset)?,
        "defaults": catalog.defaults(&dataset)?,
        "overrides": catalog.overrides(&dataset)?,
        "merged": merged,
    }))
}
