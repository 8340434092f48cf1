//! Dataset mapping resolution for archive files.
//!
//! Mapping documents (JSON) declare which datasets they govern and, per
//! dataset, attribute aliases, defaults, overrides, realisations and filename
//! filters. The crate indexes a set of such documents into a
//! `DatasetCatalog` that resolves any archive path to its dataset and answers
//! configuration questions about it, reading each document body only when a
//! dataset under it is first queried.
//!
//! Binaries are thin wrappers: `dataset-lookup` prints resolutions for paths
//! and `retag-plan` turns changed documents into retag messages.

pub mod catalog;
pub mod loader;
pub mod retag;
pub mod runtime;

pub use catalog::{
    DEFAULT_REALISATION, DatasetCatalog, DatasetId, DatasetTree, DocumentCache, DocumentHeader,
    FilterRule, MappingDocument, Mappings, PathIndex, Realisation, load_document_from_path,
};
pub use loader::{
    BootstrapReport, DocumentSource, DuplicateDeclaration, SkippedDocument,
    collect_mapping_documents,
};
pub use retag::{
    ChangedDocument, DatasetFileLister, NdjsonPublisher, RetagMessage, RetagPlanner,
    RetagPublisher, RetagSummary, StaticFileLister, changed_documents, parse_changed_files,
};
pub use runtime::default_mappings_dir;

/// Split comma- or whitespace-delimited lists (e.g. repeated CLI values) into
/// tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_accepts_commas_and_whitespace() {
        assert_eq!(split_list("a, b  c,,d"), vec!["a", "b", "c", "d"]);
        assert!(split_list("  ").is_empty());
    }
}
