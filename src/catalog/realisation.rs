//! Realisation precedence for a single file.
//!
//! Resolution starts at the default label, is overwritten by the document's
//! dataset-level realisation, then by the first filename filter that matches.
//! A matching filter without a label keeps the earlier value but still stops
//! the scan. Only the rules for the queried dataset are compiled, in order,
//! and compilation stops at the first match.

use crate::catalog::identity::{DatasetId, Realisation};
use crate::catalog::model::{FilterRule, MappingDocument};
use anyhow::{Context, Result};

/// Final path component, or the empty string for paths ending in `/`.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve the realisation for `file_path` using `document`'s configuration
/// for `dataset`.
pub fn resolve_in_document(
    document: &MappingDocument,
    dataset: &DatasetId,
    file_path: &str,
) -> Result<Realisation> {
    let mut realisation = document.realisation(dataset).unwrap_or_default();

    let file_name = base_name(file_path);
    for (position, raw) in document.filter_rules(dataset)?.iter().enumerate() {
        let rule = FilterRule::from_value(raw)
            .with_context(|| format!("filter {position} for dataset {dataset}"))?;
        if rule.matches(file_name)? {
            if let Some(label) = rule.realisation.filter(|label| label.is_set()) {
                realisation = label;
            }
            break;
        }
    }

    Ok(realisation)
}
