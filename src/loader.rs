//! Bootstrap of a `DatasetCatalog` from mapping documents.
//!
//! Every document is read once: its `datasets` are registered in the path
//! index and location table, and its `realisations` feed the dataset-level
//! realisation table. Documents that fail to parse are logged and skipped so a
//! single bad file cannot take down the whole load. Later documents win when
//! several declare the same dataset; each overlap is recorded in the report.

use crate::catalog::{
    DatasetCatalog, DatasetId, DatasetTree, DocumentCache, DocumentHeader, PathIndex,
};
use crate::runtime::default_mappings_dir;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "json";

#[derive(Clone, Debug)]
/// Where bootstrap finds its mapping documents.
pub enum DocumentSource {
    /// Exactly these files, in this order.
    Files(Vec<PathBuf>),
    /// Every `.json` file below this directory.
    Directory(PathBuf),
    /// Every `.json` file below `runtime::default_mappings_dir()`.
    DefaultDirectory,
}

impl DocumentSource {
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::Files(paths.into_iter().map(Into::into).collect())
    }

    /// Resolve the source into an ordered list of document paths.
    pub fn locations(&self) -> Result<Vec<PathBuf>> {
        match self {
            DocumentSource::Files(paths) => Ok(paths.clone()),
            DocumentSource::Directory(dir) => collect_mapping_documents(&[dir.clone()]),
            DocumentSource::DefaultDirectory => {
                let dir = default_mappings_dir()?;
                collect_mapping_documents(&[dir])
            }
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
/// Outcome of a bootstrap pass.
pub struct BootstrapReport {
    pub documents_read: usize,
    pub skipped: Vec<SkippedDocument>,
    pub duplicates: Vec<DuplicateDeclaration>,
}

#[derive(Clone, Debug, Serialize)]
/// A document left out of the catalog because it could not be parsed.
pub struct SkippedDocument {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
/// A dataset declared by more than one document; `replacement` is the one in
/// effect.
pub struct DuplicateDeclaration {
    pub dataset: DatasetId,
    pub previous: PathBuf,
    pub replacement: PathBuf,
}

impl DatasetCatalog<DatasetTree> {
    /// Build a catalog backed by the default segment trie.
    pub fn bootstrap(source: &DocumentSource) -> Result<Self> {
        Self::bootstrap_with_index(source, DatasetTree::new())
    }
}

impl<I: PathIndex> DatasetCatalog<I> {
    /// Build a catalog using a caller-supplied path index.
    ///
    /// Unreadable documents are an error; unparsable ones are skipped and
    /// listed in `report().skipped`.
    pub fn bootstrap_with_index(source: &DocumentSource, mut index: I) -> Result<Self> {
        let locations = source.locations()?;
        let mut documents = DocumentCache::default();
        let mut realisations = BTreeMap::new();
        let mut report = BootstrapReport::default();

        for location in locations {
            let contents = fs::read_to_string(&location)
                .with_context(|| format!("reading mapping document {}", location.display()))?;
            let header = match DocumentHeader::parse(&contents) {
                Ok(header) => header,
                Err(err) => {
                    tracing::warn!(path = %location.display(), error = %err, "skipping malformed mapping document");
                    report.skipped.push(SkippedDocument {
                        path: location,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            report.documents_read += 1;

            for dataset in &header.ignored_realisations {
                tracing::warn!(
                    path = %location.display(),
                    dataset = %dataset,
                    "ignoring non-string realisation; dataset falls back to the default"
                );
            }

            for dataset in header.datasets {
                if dataset.as_str().is_empty() {
                    tracing::warn!(path = %location.display(), "ignoring empty dataset identifier");
                    continue;
                }
                index.insert(&dataset);
                if let Some(previous) = documents.register(dataset.clone(), location.clone()) {
                    if previous != location {
                        tracing::warn!(
                            dataset = %dataset,
                            previous = %previous.display(),
                            replacement = %location.display(),
                            "dataset declared by more than one mapping document; keeping the later one"
                        );
                        report.duplicates.push(DuplicateDeclaration {
                            dataset,
                            previous,
                            replacement: location.clone(),
                        });
                    }
                }
            }

            realisations.extend(header.realisations);
        }

        tracing::info!(
            documents = report.documents_read,
            datasets = documents.len(),
            skipped = report.skipped.len(),
            "mapping documents indexed"
        );
        Ok(DatasetCatalog::from_parts(index, documents, realisations, report))
    }
}

/// Collect every `.json` file under the provided roots, sorted.
///
/// Traversal is recursive. Missing roots contribute nothing.
pub fn collect_mapping_documents(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for root in roots {
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "mapping document directory not found");
            continue;
        }
        collect_from_dir(root, &mut documents)?;
    }
    documents.sort();
    Ok(documents)
}

fn collect_from_dir(root: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_from_dir(&path, acc)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION) {
            acc.push(path);
        }
    }
    Ok(())
}
