//! Location table and lazy body cache for mapping documents.
//!
//! Locations are registered once during bootstrap. Bodies are read on the
//! first query for a dataset and kept for the life of the cache, keyed by
//! dataset rather than by file, so two datasets sharing a document each hold
//! their own cached copy.

use crate::catalog::identity::DatasetId;
use crate::catalog::model::{MappingDocument, load_document_from_path};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Slot = Arc<Mutex<Option<Arc<MappingDocument>>>>;

#[derive(Debug, Default)]
/// Dataset → document location, plus a memoized body per dataset.
pub struct DocumentCache {
    locations: BTreeMap<DatasetId, PathBuf>,
    bodies: Mutex<BTreeMap<DatasetId, Slot>>,
    reads: AtomicUsize,
}

impl DocumentCache {
    /// Point `dataset` at `location`, returning the location it replaced.
    pub fn register(&mut self, dataset: DatasetId, location: PathBuf) -> Option<PathBuf> {
        self.locations.insert(dataset, location)
    }

    pub fn location(&self, dataset: &str) -> Option<&Path> {
        self.locations.get(dataset).map(PathBuf::as_path)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &DatasetId> {
        self.locations.keys()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of document bodies read from disk, successful or not.
    pub fn document_reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Whether the body for `dataset` has already been loaded.
    pub fn is_cached(&self, dataset: &str) -> bool {
        let slot = {
            let bodies = self.bodies.lock().unwrap_or_else(PoisonError::into_inner);
            bodies.get(dataset).cloned()
        };
        slot.map(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
        })
        .unwrap_or(false)
    }

    /// Body of the document governing `dataset`, reading it on first access.
    ///
    /// Unregistered datasets yield an empty document. Read and parse failures
    /// propagate and leave the slot empty so a later call retries. Loads of
    /// the same dataset are serialized; different datasets load independently.
    pub fn load(&self, dataset: &str) -> Result<Arc<MappingDocument>> {
        let Some((key, location)) = self.locations.get_key_value(dataset) else {
            return Ok(Arc::new(MappingDocument::default()));
        };

        let slot: Slot = {
            let mut bodies = self.bodies.lock().unwrap_or_else(PoisonError::into_inner);
            bodies.entry(key.clone()).or_default().clone()
        };

        let mut body = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(document) = body.as_ref() {
            return Ok(Arc::clone(document));
        }

        tracing::debug!(dataset = %key, path = %location.display(), "loading mapping document");
        self.reads.fetch_add(1, Ordering::Relaxed);
        let document = Arc::new(load_document_from_path(location)?);
        *body = Some(Arc::clone(&document));
        Ok(document)
    }
}
