//! Retag planning for changed mapping documents.
//!
//! When mapping documents change, every file of every dataset they declare
//! must be re-tagged. This module turns a list of changed repository paths
//! into deposit-style messages, one per archive file. Finding the changed
//! paths (version control), listing a dataset's files (search index) and
//! delivering messages (broker) stay behind `DatasetFileLister` and
//! `RetagPublisher`; the local implementations here cover file lists and
//! NDJSON output.

use crate::catalog::DatasetId;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROUTING_KEY: &str = "opensearch.tagger.cci";
pub const DEPOSIT_ACTION: &str = "DEPOSIT";
/// Repository-relative directory holding mapping documents.
pub const DEFAULT_DOCUMENT_PREFIX: &str = "json";

const DEPOSIT_DATETIME_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";
/// Used when the timestamp has a non-zero microsecond part.
const DEPOSIT_DATETIME_FORMAT_MICROS: &str = "%Y-%m-%d-%H:%M:%S%.6f";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Message body in the deposit log shape consumed by the tagging pipeline.
pub struct RetagMessage {
    pub datetime: String,
    pub filepath: String,
    pub action: String,
    pub filesize: u64,
    pub message: String,
}

impl RetagMessage {
    pub fn new(filepath: impl Into<String>, action: &str, at: DateTime<Local>) -> Self {
        let format = if at.timestamp_subsec_micros() == 0 {
            DEPOSIT_DATETIME_FORMAT
        } else {
            DEPOSIT_DATETIME_FORMAT_MICROS
        };
        Self {
            datetime: at.format(format).to_string(),
            filepath: filepath.into(),
            action: action.to_uppercase(),
            filesize: 0,
            message: String::new(),
        }
    }

    /// A `DEPOSIT` message stamped with the current local time.
    pub fn deposit(filepath: impl Into<String>) -> Self {
        Self::new(filepath, DEPOSIT_ACTION, Local::now())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing retag message")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// A changed mapping document and the datasets it declares.
pub struct ChangedDocument {
    pub path: PathBuf,
    pub datasets: Vec<DatasetId>,
}

#[derive(Deserialize)]
struct DeclaredDatasets {
    datasets: Vec<DatasetId>,
}

/// Split changed-path listings (one per line) into unique, non-empty paths.
pub fn parse_changed_files(listing: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Read the changed mapping documents among `changed_files`.
///
/// Only `.json` paths under `prefix` (relative to `repo_root`) count. Paths
/// that no longer exist were deleted by the change and are skipped. Each
/// remaining document must declare `datasets`.
pub fn changed_documents(
    repo_root: &Path,
    changed_files: &[String],
    prefix: &str,
) -> Result<Vec<ChangedDocument>> {
    let mut documents = Vec::new();
    for changed in changed_files {
        let relative = Path::new(changed);
        if !relative.starts_with(prefix) {
            continue;
        }
        if relative.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let path = repo_root.join(relative);
        if !path.is_file() {
            tracing::info!(path = %path.display(), "changed mapping document no longer present; skipping");
            continue;
        }
        let data =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let declared: DeclaredDatasets = serde_json::from_str(&data)
            .with_context(|| format!("reading datasets from {}", path.display()))?;
        documents.push(ChangedDocument {
            path,
            datasets: declared.datasets,
        });
    }
    Ok(documents)
}

/// Lists the archive files currently belonging to a dataset.
pub trait DatasetFileLister {
    fn files(&self, dataset: &DatasetId) -> Result<Vec<String>>;
}

/// Delivers one message body under a routing key.
pub trait RetagPublisher {
    fn publish(&mut self, routing_key: &str, body: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
/// File lister over a fixed list of archive paths.
pub struct StaticFileLister {
    files: Vec<String>,
}

impl StaticFileLister {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }

    /// One archive path per line; blank lines are ignored.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut files = Vec::new();
        for line in reader.lines() {
            let line = line.context("reading file list")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                files.push(trimmed.to_string());
            }
        }
        Ok(Self { files })
    }
}

impl DatasetFileLister for StaticFileLister {
    fn files(&self, dataset: &DatasetId) -> Result<Vec<String>> {
        let root = Path::new(dataset.as_str());
        Ok(self
            .files
            .iter()
            .filter(|file| Path::new(file.as_str()).starts_with(root))
            .cloned()
            .collect())
    }
}

/// Publisher writing each body as one line, ignoring the routing key.
pub struct NdjsonPublisher<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RetagPublisher for NdjsonPublisher<W> {
    fn publish(&mut self, _routing_key: &str, body: &str) -> Result<()> {
        writeln!(self.writer, "{body}").context("writing retag message")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
/// What a retag run touched.
pub struct RetagSummary {
    pub documents: usize,
    pub datasets: Vec<DatasetId>,
    pub messages: usize,
}

#[derive(Clone, Debug)]
/// Turns changed documents into one deposit message per dataset file.
pub struct RetagPlanner {
    routing_key: String,
    dry_run: bool,
}

impl Default for RetagPlanner {
    fn default() -> Self {
        Self {
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            dry_run: false,
        }
    }
}

impl RetagPlanner {
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    /// In dry-run mode datasets are collected but no files are listed and
    /// nothing is published.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run(
        &self,
        documents: &[ChangedDocument],
        lister: &impl DatasetFileLister,
        publisher: &mut impl RetagPublisher,
    ) -> Result<RetagSummary> {
        let mut summary = RetagSummary {
            documents: documents.len(),
            ..RetagSummary::default()
        };

        for document in documents {
            for dataset in &document.datasets {
                summary.datasets.push(dataset.clone());
                if self.dry_run {
                    continue;
                }
                let files = lister
                    .files(dataset)
                    .with_context(|| format!("listing files for dataset {dataset}"))?;
                for file in files {
                    let body = RetagMessage::deposit(file).to_json()?;
                    publisher.publish(&self.routing_key, &body)?;
                    summary.messages += 1;
                }
                tracing::debug!(dataset = %dataset, document = %document.path.display(), "dataset queued for retagging");
            }
        }

        tracing::info!(
            documents = summary.documents,
            datasets = summary.datasets.len(),
            messages = summary.messages,
            dry_run = self.dry_run,
            "retag run complete"
        );
        Ok(summary)
    }
}
