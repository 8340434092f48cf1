//! Dataset catalog: path → dataset resolution and per-dataset configuration.
//!
//! `DatasetCatalog` owns the path index, the document location table, the
//! lazily filled body cache and the bootstrap-time realisation table. It is
//! built once by `DatasetCatalog::bootstrap` (see `loader`) and is read-only
//! afterwards apart from the body cache filling in.

pub mod identity;
pub mod index;
pub mod model;
pub mod realisation;
pub mod repository;

pub use identity::{DEFAULT_REALISATION, DatasetId, Realisation};
pub use index::{DatasetTree, PathIndex};
pub use model::{DocumentHeader, FilterRule, MappingDocument, Mappings, load_document_from_path};
pub use repository::DocumentCache;

use crate::loader::BootstrapReport;
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
/// Query surface over a set of mapping documents.
pub struct DatasetCatalog<I = DatasetTree> {
    index: I,
    documents: DocumentCache,
    realisations: BTreeMap<DatasetId, Realisation>,
    report: BootstrapReport,
}

impl<I: PathIndex> DatasetCatalog<I> {
    pub(crate) fn from_parts(
        index: I,
        documents: DocumentCache,
        realisations: BTreeMap<DatasetId, Realisation>,
        report: BootstrapReport,
    ) -> Self {
        Self {
            index,
            documents,
            realisations,
            report,
        }
    }

    /// Dataset owning `path`: the deepest registered dataset prefix, or the
    /// path itself when nothing matches.
    pub fn resolve_dataset(&self, path: &str) -> DatasetId {
        match self.index.search(path) {
            Some(dataset) => dataset.clone(),
            None => DatasetId::verbatim(path),
        }
    }

    /// Full document body for `dataset`, loaded and cached on first use.
    /// Datasets without a registered document get an empty body.
    pub fn load_document(&self, dataset: impl AsRef<str>) -> Result<Arc<MappingDocument>> {
        let dataset = DatasetId::new(dataset);
        self.documents.load(dataset.as_str())
    }

    /// The `mappings` section, empty when absent.
    pub fn mapping(&self, dataset: impl AsRef<str>) -> Result<Mappings> {
        Ok(self.load_document(dataset)?.mappings())
    }

    /// The `defaults` section, empty when absent.
    pub fn defaults(&self, dataset: impl AsRef<str>) -> Result<Map<String, Value>> {
        Ok(self.load_document(dataset)?.defaults())
    }

    /// The `overrides` section; `None` when the document configures none.
    pub fn overrides(&self, dataset: impl AsRef<str>) -> Result<Option<Map<String, Value>>> {
        Ok(self.load_document(dataset)?.overrides())
    }

    /// Map a merged attribute string to its configured alias, or return it
    /// unchanged.
    pub fn merged_attribute(&self, dataset: impl AsRef<str>, attribute: &str) -> Result<String> {
        let document = self.load_document(dataset)?;
        let mappings = document.mappings();
        Ok(mappings.merged_alias(attribute).unwrap_or(attribute).to_string())
    }

    /// Realisation for one file of `dataset`, honouring filename filters.
    pub fn resolve_realisation(
        &self,
        dataset: impl AsRef<str>,
        file_path: &str,
    ) -> Result<Realisation> {
        let dataset = DatasetId::new(dataset);
        let document = self.documents.load(dataset.as_str())?;
        realisation::resolve_in_document(&document, &dataset, file_path)
    }

    /// Dataset-level realisation recorded at bootstrap. Ignores filters and
    /// never reads a document.
    pub fn dataset_realisation(&self, dataset: impl AsRef<str>) -> Realisation {
        let dataset = DatasetId::new(dataset);
        self.realisations
            .get(&dataset)
            .filter(|label| label.is_set())
            .cloned()
            .unwrap_or_default()
    }

    /// Registered datasets in sorted order.
    pub fn datasets(&self) -> impl Iterator<Item = &DatasetId> {
        self.documents.datasets()
    }

    /// Document registered for `dataset`, if any.
    pub fn location(&self, dataset: impl AsRef<str>) -> Option<&Path> {
        let dataset = DatasetId::new(dataset);
        self.documents.location(dataset.as_str())
    }

    pub fn is_cached(&self, dataset: impl AsRef<str>) -> bool {
        let dataset = DatasetId::new(dataset);
        self.documents.is_cached(dataset.as_str())
    }

    /// Number of document bodies read from disk so far.
    pub fn document_reads(&self) -> usize {
        self.documents.document_reads()
    }

    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    pub fn index(&self) -> &I {
        &self.index
    }
}
