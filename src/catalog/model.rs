//! Representation of a mapping document.
//!
//! A mapping document declares the datasets it governs plus optional
//! attribute aliases, defaults, overrides, realisations and filename filters.
//! `DocumentHeader` is the slice read during bootstrap; `MappingDocument` is
//! the full body loaded lazily on the first query for a dataset. The body is
//! kept as raw JSON sections and each accessor reads only what it needs, so a
//! malformed entry for one dataset cannot break queries about another.

use crate::catalog::identity::{DatasetId, Realisation};
use anyhow::{Context, Result, anyhow, bail};
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq)]
/// Full mapping document as stored on disk.
pub struct MappingDocument {
    body: Map<String, Value>,
}

impl MappingDocument {
    /// Wrap a parsed document; the top level must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(body) => Ok(Self { body }),
            other => bail!("mapping document must be a JSON object, found {}", json_type(&other)),
        }
    }

    /// The `mappings` section, empty when absent or not an object.
    pub fn mappings(&self) -> Mappings {
        self.body
            .get("mappings")
            .and_then(Value::as_object)
            .map(Mappings::from_section)
            .unwrap_or_default()
    }

    /// The `defaults` section, empty when absent or not an object.
    pub fn defaults(&self) -> Map<String, Value> {
        self.body
            .get("defaults")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// `None` when `overrides` is absent, `null` or not an object; distinct
    /// from `Some({})`.
    pub fn overrides(&self) -> Option<Map<String, Value>> {
        self.body.get("overrides").and_then(Value::as_object).cloned()
    }

    /// Dataset-level label from `realisations`, if a non-empty string.
    pub fn realisation(&self, dataset: &DatasetId) -> Option<Realisation> {
        let raw = dataset_entry(self.body.get("realisations")?, dataset)?;
        let label = raw.as_str().filter(|label| !label.is_empty())?;
        Some(Realisation::from(label))
    }

    /// Raw filter rules declared for `dataset`, in declared order.
    ///
    /// Rules are left unparsed; callers compile each one as they reach it.
    pub fn filter_rules(&self, dataset: &DatasetId) -> Result<&[Value]> {
        let Some(filters) = self.body.get("filters") else {
            return Ok(&[]);
        };
        match dataset_entry(filters, dataset) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(rules)) => Ok(rules),
            Some(other) => bail!(
                "filters for dataset {dataset} must be a list, found {}",
                json_type(other)
            ),
        }
    }
}

/// Entry for `dataset` in a section keyed by dataset identifier. Keys are
/// compared after normalization, so `"a/b/"` finds `a/b`.
fn dataset_entry<'a>(section: &'a Value, dataset: &DatasetId) -> Option<&'a Value> {
    let section = section.as_object()?;
    section
        .get(dataset.as_str())
        .or_else(|| {
            section
                .iter()
                .find(|(key, _)| DatasetId::new(key.as_str()) == *dataset)
                .map(|(_, value)| value)
        })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
/// The `mappings` section. Only `merged` is interpreted; other sub-sections
/// are carried through for callers.
pub struct Mappings {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub merged: BTreeMap<String, String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Mappings {
    fn from_section(section: &Map<String, Value>) -> Self {
        let mut mappings = Mappings::default();
        for (key, value) in section {
            if key == "merged" {
                if let Some(merged) = value.as_object() {
                    mappings.merged = merged
                        .iter()
                        .filter_map(|(attr, alias)| Some((attr.clone(), alias.as_str()?.to_string())))
                        .collect();
                }
            } else {
                mappings.other.insert(key.clone(), value.clone());
            }
        }
        mappings
    }

    /// Alias for `attribute` under `merged`, ignoring empty aliases.
    pub fn merged_alias(&self, attribute: &str) -> Option<&str> {
        self.merged
            .get(attribute)
            .map(String::as_str)
            .filter(|alias| !alias.is_empty())
    }
}

#[derive(Clone, Debug)]
/// Filename filter: `pattern` is matched against a file's base name,
/// anchored at the start but free to stop before the end.
pub struct FilterRule {
    pub pattern: String,
    pub realisation: Option<Realisation>,
    matcher: Regex,
}

impl FilterRule {
    pub fn new(pattern: impl Into<String>, realisation: Option<Realisation>) -> Result<Self> {
        let pattern = pattern.into();
        let matcher = Regex::new(&format!("^(?:{pattern})"))
            .with_context(|| format!("compiling filter pattern {pattern:?}"))?;
        Ok(Self {
            pattern,
            realisation,
            matcher,
        })
    }

    /// Build a rule from its JSON form `{"pattern": ..., "realisation": ...}`.
    /// A missing or non-string `realisation` means the rule carries no label.
    pub fn from_value(value: &Value) -> Result<Self> {
        let pattern = value
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("filter rule is missing a string 'pattern': {value}"))?;
        let realisation = value
            .get("realisation")
            .and_then(Value::as_str)
            .map(Realisation::from);
        Self::new(pattern, realisation)
    }

    pub fn matches(&self, file_name: &str) -> Result<bool> {
        self.matcher
            .is_match(file_name)
            .with_context(|| format!("matching filter pattern {:?}", self.pattern))
    }
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    datasets: Vec<DatasetId>,
    #[serde(default)]
    realisations: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Default)]
/// The parts of a document needed at bootstrap. Everything else is left
/// unparsed until a dataset under the document is queried.
pub struct DocumentHeader {
    pub datasets: Vec<DatasetId>,
    pub realisations: BTreeMap<DatasetId, Realisation>,
    /// Datasets whose `realisations` entry was not a string and was dropped.
    pub ignored_realisations: Vec<DatasetId>,
}

impl DocumentHeader {
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        let raw: RawHeader = serde_json::from_str(contents)?;
        let mut header = DocumentHeader {
            datasets: raw.datasets,
            ..DocumentHeader::default()
        };
        for (key, value) in raw.realisations.unwrap_or_default() {
            let dataset = DatasetId::new(key);
            match value {
                Value::String(label) => {
                    header.realisations.insert(dataset, Realisation(label));
                }
                _ => header.ignored_realisations.push(dataset),
            }
        }
        Ok(header)
    }
}

/// Read and parse a full mapping document from disk.
pub fn load_document_from_path(path: &Path) -> Result<MappingDocument> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    MappingDocument::from_value(value).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> MappingDocument {
        MappingDocument::from_value(value).expect("object document")
    }

    #[test]
    fn missing_sections_fall_back_to_empty() {
        let doc = document(json!({"datasets": ["a/b"]}));
        let ds = DatasetId::from("a/b");
        assert!(doc.mappings().merged.is_empty());
        assert!(doc.defaults().is_empty());
        assert!(doc.overrides().is_none());
        assert!(doc.realisation(&ds).is_none());
        assert!(doc.filter_rules(&ds).unwrap().is_empty());
    }

    #[test]
    fn overrides_distinguish_absent_null_and_empty() {
        assert!(document(json!({})).overrides().is_none());
        assert!(document(json!({"overrides": null})).overrides().is_none());
        assert_eq!(document(json!({"overrides": {}})).overrides(), Some(Map::new()));
    }

    #[test]
    fn mappings_keep_unknown_sections() {
        let doc = document(json!({
            "mappings": {
                "merged": {"SST,SSS": "sst,sss", "odd": 3},
                "platform": {"NOAA-19": "noaa-19"}
            }
        }));
        let mappings = doc.mappings();
        assert_eq!(mappings.merged_alias("SST,SSS"), Some("sst,sss"));
        assert_eq!(mappings.merged_alias("odd"), None);
        assert!(mappings.other.contains_key("platform"));
    }

    #[test]
    fn empty_merged_alias_is_ignored() {
        let doc = document(json!({"mappings": {"merged": {"x": ""}}}));
        assert_eq!(doc.mappings().merged_alias("x"), None);
    }

    #[test]
    fn off_type_sections_degrade_to_empty() {
        let doc = document(json!({
            "mappings": [1],
            "defaults": "none",
            "overrides": 5,
            "realisations": {"a": 2}
        }));
        assert!(doc.mappings().merged.is_empty());
        assert!(doc.defaults().is_empty());
        assert!(doc.overrides().is_none());
        assert!(doc.realisation(&DatasetId::from("a")).is_none());
    }

    #[test]
    fn dataset_keys_are_matched_after_normalization() {
        let doc = document(json!({
            "realisations": {"a/b/": "r2"},
            "filters": {"a/b/": [{"pattern": "X"}]}
        }));
        let ds = DatasetId::from("a/b");
        assert_eq!(doc.realisation(&ds), Some(Realisation::from("r2")));
        assert_eq!(doc.filter_rules(&ds).unwrap().len(), 1);
    }

    #[test]
    fn non_list_filters_for_dataset_are_an_error() {
        let doc = document(json!({"filters": {"a": {"pattern": "X"}, "b": null}}));
        assert!(doc.filter_rules(&DatasetId::from("a")).is_err());
        assert!(doc.filter_rules(&DatasetId::from("b")).unwrap().is_empty());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(MappingDocument::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn filter_pattern_is_anchored_at_start_only() {
        let rule = FilterRule::new("FOO", Some(Realisation::from("r3"))).unwrap();
        assert!(rule.matches("FOO-20200101.nc").unwrap());
        assert!(rule.matches("FOO").unwrap());
        assert!(!rule.matches("xFOO.nc").unwrap());

        let alternation = FilterRule::new("A|B", None).unwrap();
        assert!(alternation.matches("Bfile").unwrap());
        assert!(!alternation.matches("xB").unwrap());
    }

    #[test]
    fn filter_pattern_supports_look_around() {
        let rule = FilterRule::new("(?!tmp)\\w+\\.nc", None).unwrap();
        assert!(rule.matches("data.nc").unwrap());
        assert!(!rule.matches("tmpdata.nc").unwrap());
    }

    #[test]
    fn filter_rule_from_value_requires_pattern() {
        assert!(FilterRule::from_value(&json!({"realisation": "r2"})).is_err());
        assert!(FilterRule::from_value(&json!({"pattern": "("})).is_err());
        let rule = FilterRule::from_value(&json!({"pattern": "X", "realisation": "r4"})).unwrap();
        assert_eq!(rule.realisation, Some(Realisation::from("r4")));
    }

    #[test]
    fn header_ignores_body_sections() {
        let header = DocumentHeader::parse(
            r#"{"datasets": ["a/b/"], "realisations": {"a/b": "r2"}, "filters": {"a/b": 7}}"#,
        )
        .unwrap();
        assert_eq!(header.datasets, vec![DatasetId::from("a/b")]);
        assert_eq!(header.realisations.get("a/b"), Some(&Realisation::from("r2")));
    }

    #[test]
    fn header_drops_non_string_realisations() {
        let header = DocumentHeader::parse(
            r#"{"datasets": ["a/b", "c"], "realisations": {"a/b": null, "c": "r3"}}"#,
        )
        .unwrap();
        assert_eq!(header.datasets.len(), 2);
        assert_eq!(header.realisations.len(), 1);
        assert_eq!(header.ignored_realisations, vec![DatasetId::from("a/b")]);

        let null_section = DocumentHeader::parse(r#"{"datasets": ["x"], "realisations": null}"#).unwrap();
        assert!(null_section.realisations.is_empty());
    }

    #[test]
    fn header_rejects_non_object_documents() {
        assert!(DocumentHeader::parse("[1, 2]").is_err());
        assert!(DocumentHeader::parse("{\"datasets\": \"a/b\"}").is_err());
        assert!(DocumentHeader::parse("{not json").is_err());
    }
}
