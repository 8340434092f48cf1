use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

/// Label returned when no realisation is configured for a dataset or file.
pub const DEFAULT_REALISATION: &str = "r1";

/// Identifier of a logical dataset, normally the archive path of its root.
///
/// Identifiers are normalized on construction: surrounding whitespace and
/// trailing `/` are dropped so `"/neodc/a/"` and `"/neodc/a"` name the same
/// dataset. A bare `/` is kept as-is.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        let stripped = trimmed.trim_end_matches('/');
        if stripped.is_empty() && trimmed.starts_with('/') {
            return Self("/".to_string());
        }
        Self(stripped.to_string())
    }

    /// Wrap `raw` without normalizing; used when echoing an unmatched path.
    pub(crate) fn verbatim(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DatasetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DatasetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DatasetId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for DatasetId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DatasetId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

/// Realisation label (e.g. `r1`, `r2`) naming a generation of a dataset.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Realisation(pub String);

impl Realisation {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty labels count as "not configured" and never override a prior value.
    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }
}

impl Default for Realisation {
    fn default() -> Self {
        Self(DEFAULT_REALISATION.to_string())
    }
}

impl fmt::Display for Realisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Realisation {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
