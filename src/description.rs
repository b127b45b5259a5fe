//! Declarative pipeline descriptions and their YAML serialization
//!
//! A description names every stage of a pipeline and the registered
//! component type each name resolves to. Transformers may declare the
//! transformer outputs they consume with `depends_on`.
//!
//! Example format:
//! ```yaml
//! extractors:
//!   people:
//!     type: csv_file
//!     params:
//!       path: data/people.csv
//! transformers:
//!   clean:
//!     type: drop_fields
//!     params:
//!       fields:
//!         - ssn
//!   merge:
//!     type: passthrough
//!     depends_on:
//!       - clean
//! loaders:
//!   out:
//!     type: ndjson_file
//!     params:
//!       path: out/people.ndjson
//! ```

use crate::error::DescriptionError;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// One extractor or loader entry: a component type and its parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    /// Registered component type identifier
    #[serde(rename = "type")]
    pub type_id: String,
    /// Component parameters, handed verbatim to the constructor
    #[serde(default = "empty_params", skip_serializing_if = "is_empty_params")]
    pub params: Value,
}

impl StageSpec {
    /// Create a spec with no parameters
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            params: empty_params(),
        }
    }

    /// Create a spec with parameters
    pub fn with_params(type_id: impl Into<String>, params: Value) -> Self {
        Self {
            type_id: type_id.into(),
            params,
        }
    }
}

/// One transformer entry: a component type, its parameters, and the
/// transformers whose outputs feed it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransformSpec {
    /// Registered component type identifier
    #[serde(rename = "type")]
    pub type_id: String,
    /// Component parameters, handed verbatim to the constructor
    #[serde(default = "empty_params", skip_serializing_if = "is_empty_params")]
    pub params: Value,
    /// Names of upstream transformers, in input merge order
    ///
    /// Empty means this transformer consumes the combined extraction batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TransformSpec {
    /// Create a spec with no parameters and no dependencies
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            params: empty_params(),
            depends_on: Vec::new(),
        }
    }

    /// Create a spec with parameters and no dependencies
    pub fn with_params(type_id: impl Into<String>, params: Value) -> Self {
        Self {
            type_id: type_id.into(),
            params,
            depends_on: Vec::new(),
        }
    }

    /// Declare the upstream transformers this one consumes, in merge order
    pub fn with_depends_on(
        mut self,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.depends_on = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Complete declarative description of a pipeline
///
/// All three sections are optional in the YAML document; an omitted
/// section is an empty collection. Unknown keys anywhere in the document
/// are rejected rather than silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineDescription {
    /// Named extractors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extractors: BTreeMap<String, StageSpec>,
    /// Named transformers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transformers: BTreeMap<String, TransformSpec>,
    /// Named loaders
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loaders: BTreeMap<String, StageSpec>,
}

impl PipelineDescription {
    /// Create an empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a description from a YAML file
    ///
    /// # Errors
    /// Returns [`DescriptionError::Io`] when the file cannot be read and
    /// [`DescriptionError::Parse`] when its contents are not a valid
    /// description. A parse failure never yields a partial description.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DescriptionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DescriptionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| DescriptionError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a description from YAML text
    ///
    /// # Errors
    /// Returns [`DescriptionError::Parse`] when the text is not a valid
    /// description.
    pub fn parse(text: &str) -> Result<Self, DescriptionError> {
        serde_yaml::from_str(text).map_err(|source| DescriptionError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Write the description to a YAML file
    ///
    /// Creates parent directories as needed.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .with_context(|| "Failed to serialize pipeline description to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write pipeline description: {}", path.display()))?;

        Ok(())
    }

    /// Declared transformer dependency edges, keyed by dependent name
    ///
    /// Only transformers that declare `depends_on` appear as keys; the
    /// edge order inside each entry is the declared order.
    pub fn dependency_map(&self) -> BTreeMap<String, Vec<String>> {
        self.transformers
            .iter()
            .filter(|(_, spec)| !spec.depends_on.is_empty())
            .map(|(name, spec)| (name.clone(), spec.depends_on.clone()))
            .collect()
    }

    /// Total number of stages across all three sections
    pub fn stage_count(&self) -> usize {
        self.extractors.len() + self.transformers.len() + self.loaders.len()
    }
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

fn is_empty_params(params: &Value) -> bool {
    matches!(params, Value::Object(map) if map.is_empty())
}
