//! Configuration types for vector indexes.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::{CosineDistance, Distance, DotProductDistance, IndexOptions};
use crate::error::{AnnexError, Result};

/// Engine instantiation selected by the `type` configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// `1 - <a, b>` over normalized data.
    DotProduct,
    /// `1 - cos(a, b)`.
    Cosine,
}

impl IndexType {
    /// Get the name of this index type.
    pub fn name(&self) -> &'static str {
        match self {
            IndexType::DotProduct => "dot_product",
            IndexType::Cosine => "cosine",
        }
    }

    /// Distance between two vectors under this type's metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            IndexType::DotProduct => DotProductDistance.distance(a, b),
            IndexType::Cosine => CosineDistance.distance(a, b),
        }
    }
}

impl FromStr for IndexType {
    type Err = AnnexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dot_product" => Ok(IndexType::DotProduct),
            "cosine" => Ok(IndexType::Cosine),
            _ => Err(AnnexError::config(format!("unknown index type: {s}"))),
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime index configuration.
///
/// Every optional field left unset keeps the engine default from
/// [`IndexOptions::default`]. Strings are validated by [`IndexConfig::options`]
/// and by the factory, not on deserialization, so bad values surface as
/// configuration errors naming the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// `dot_product` or `cosine`.
    #[serde(rename = "type")]
    pub index_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_links: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ef_construction: Option<usize>,

    /// `link_nearest` or `link_diverse`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_method: Option<String>,

    /// `no_link` or `compensate_incoming_links`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_method: Option<String>,
}

impl IndexConfig {
    /// Create a configuration with engine defaults for everything but the type.
    pub fn new<S: Into<String>>(index_type: S) -> Self {
        Self {
            index_type: index_type.into(),
            max_links: None,
            ef_construction: None,
            insert_method: None,
            remove_method: None,
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = Some(max_links);
        self
    }

    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = Some(ef_construction);
        self
    }

    pub fn with_insert_method<S: Into<String>>(mut self, insert_method: S) -> Self {
        self.insert_method = Some(insert_method.into());
        self
    }

    pub fn with_remove_method<S: Into<String>>(mut self, remove_method: S) -> Self {
        self.remove_method = Some(remove_method.into());
        self
    }

    /// Parse the index type.
    pub fn index_type(&self) -> Result<IndexType> {
        self.index_type.parse()
    }

    /// Engine defaults overridden by the fields that are set.
    ///
    /// Empty method strings count as unset.
    pub fn options(&self) -> Result<IndexOptions> {
        let mut options = IndexOptions::default();

        if let Some(max_links) = self.max_links {
            options.max_links = max_links;
        }
        if let Some(ef_construction) = self.ef_construction {
            options.ef_construction = ef_construction;
        }
        if let Some(method) = non_empty(&self.insert_method) {
            options.insert_method = method.parse()?;
        }
        if let Some(method) = non_empty(&self.remove_method) {
            options.remove_method = method.parse()?;
        }

        options.validate()?;
        Ok(options)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InsertMethod, RemoveMethod};

    #[test]
    fn test_index_type() {
        assert_eq!(
            "dot_product".parse::<IndexType>().unwrap(),
            IndexType::DotProduct
        );
        assert_eq!("cosine".parse::<IndexType>().unwrap(), IndexType::Cosine);

        let err = "euclidean".parse::<IndexType>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("euclidean"));
    }

    #[test]
    fn test_unset_fields_keep_engine_defaults() {
        let options = IndexConfig::new("cosine").options().unwrap();
        assert_eq!(options, IndexOptions::default());
    }

    #[test]
    fn test_set_fields_override() {
        let options = IndexConfig::new("cosine")
            .with_max_links(12)
            .with_ef_construction(64)
            .with_insert_method("link_diverse")
            .with_remove_method("no_link")
            .options()
            .unwrap();

        assert_eq!(options.max_links, 12);
        assert_eq!(options.ef_construction, 64);
        assert_eq!(options.insert_method, InsertMethod::LinkDiverse);
        assert_eq!(options.remove_method, RemoveMethod::NoLink);
    }

    #[test]
    fn test_empty_method_strings_are_unset() {
        let options = IndexConfig::new("cosine")
            .with_insert_method("")
            .with_remove_method("")
            .options()
            .unwrap();
        assert_eq!(options, IndexOptions::default());
    }

    #[test]
    fn test_invalid_values() {
        let err = IndexConfig::new("cosine")
            .with_remove_method("unlink")
            .options()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("unknown remove method: unlink"));

        let err = IndexConfig::new("cosine")
            .with_max_links(0)
            .options()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_json() {
        let config: IndexConfig =
            serde_json::from_str(r#"{"type":"dot_product","max_links":16}"#).unwrap();
        assert_eq!(config, IndexConfig::new("dot_product").with_max_links(16));

        let json = serde_json::to_string(&IndexConfig::new("cosine")).unwrap();
        assert_eq!(json, r#"{"type":"cosine"}"#);
    }
}
