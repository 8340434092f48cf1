//! Longest-prefix lookup from archive paths to dataset identifiers.
//!
//! `PathIndex` is the seam the catalog consumes; `DatasetTree` is the default
//! implementation, a trie over `/`-separated path segments. Matching is
//! segment-aligned: `a/b` is a prefix of `a/b/c.nc` but not of `a/bc.nc`.

use crate::catalog::identity::DatasetId;
use std::collections::BTreeMap;

/// Store of dataset paths answering longest stored prefix queries.
pub trait PathIndex {
    /// Register a dataset path. Inserting the same path twice is a no-op.
    fn insert(&mut self, dataset: &DatasetId);

    /// Deepest registered dataset whose path is a prefix of `path`.
    fn search(&self, path: &str) -> Option<&DatasetId>;
}

#[derive(Debug, Default)]
/// Segment trie keyed by path components.
pub struct DatasetTree {
    absolute: Node,
    relative: Node,
    len: usize,
}

#[derive(Debug, Default)]
struct Node {
    dataset: Option<DatasetId>,
    children: BTreeMap<String, Node>,
}

impl DatasetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct dataset paths stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn root(&self, path: &str) -> &Node {
        if path.starts_with('/') {
            &self.absolute
        } else {
            &self.relative
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl PathIndex for DatasetTree {
    fn insert(&mut self, dataset: &DatasetId) {
        let path = dataset.as_str();
        let mut node = if path.starts_with('/') {
            &mut self.absolute
        } else {
            &mut self.relative
        };
        for segment in segments(path) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.dataset.is_none() {
            self.len += 1;
        }
        node.dataset = Some(dataset.clone());
    }

    fn search(&self, path: &str) -> Option<&DatasetId> {
        let mut node = self.root(path);
        let mut best = node.dataset.as_ref();
        for segment in segments(path) {
            let Some(child) = node.children.get(segment) else {
                break;
            };
            node = child;
            if node.dataset.is_some() {
                best = node.dataset.as_ref();
            }
        }
        best
    }
}
