//! Component type registry
//!
//! Maps component type identifiers to constructors. The registry is an
//! explicit value handed to [`PipelineFactory`](crate::factory::PipelineFactory)
//! rather than process-global state, so different factories can expose
//! different component sets.

use crate::components::{
    CsvBufferLoader, CsvExtractor, FieldDropper, MemoryExtractor, NdjsonExtractor, NdjsonLoader,
    Passthrough,
};
use crate::etl::{Extractor, Loader, Transformer};
use eyre::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a registered extractor type
pub type ExtractorCtor = Box<dyn Fn(Value) -> Result<Arc<dyn Extractor>> + Send + Sync>;
/// Constructor for a registered transformer type
pub type TransformerCtor = Box<dyn Fn(Value) -> Result<Arc<dyn Transformer>> + Send + Sync>;
/// Constructor for a registered loader type
pub type LoaderCtor = Box<dyn Fn(Value) -> Result<Arc<dyn Loader>> + Send + Sync>;

/// Registry of component constructors, keyed by type identifier
///
/// Extractors, transformers, and loaders live in separate namespaces, so
/// the same identifier may name one of each. Registering an identifier a
/// second time replaces the earlier constructor.
///
/// # Example
/// ```
/// use flowline::components::Passthrough;
/// use flowline::registry::ComponentRegistry;
/// use std::sync::Arc;
///
/// let mut registry = ComponentRegistry::with_builtins();
/// registry.register_transformer("noop", |_params| Ok(Arc::new(Passthrough::new())));
///
/// assert!(registry.resolve_transformer("noop").is_some());
/// assert!(registry.resolve_extractor("csv_file").is_some());
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    extractors: HashMap<String, ExtractorCtor>,
    transformers: HashMap<String, TransformerCtor>,
    loaders: HashMap<String, LoaderCtor>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in component type registered
    ///
    /// | Kind        | Type identifier | Component |
    /// |-------------|-----------------|-----------|
    /// | extractor   | `csv_file`      | [`CsvExtractor`] |
    /// | extractor   | `memory`        | [`MemoryExtractor`] |
    /// | extractor   | `ndjson_file`   | [`NdjsonExtractor`] |
    /// | transformer | `passthrough`   | [`Passthrough`] |
    /// | transformer | `drop_fields`   | [`FieldDropper`] |
    /// | loader      | `csv_buffer`    | [`CsvBufferLoader`] |
    /// | loader      | `ndjson_file`   | [`NdjsonLoader`] |
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_extractor("csv_file", |params| {
            Ok(Arc::new(CsvExtractor::from_params(params)?))
        });
        registry.register_extractor("memory", |params| {
            Ok(Arc::new(MemoryExtractor::from_params(params)?))
        });
        registry.register_extractor("ndjson_file", |params| {
            Ok(Arc::new(NdjsonExtractor::from_params(params)?))
        });
        registry.register_transformer("passthrough", |params| {
            Ok(Arc::new(Passthrough::from_params(params)?))
        });
        registry.register_transformer("drop_fields", |params| {
            Ok(Arc::new(FieldDropper::from_params(params)?))
        });
        registry.register_loader("csv_buffer", |params| {
            Ok(Arc::new(CsvBufferLoader::from_params(params)?))
        });
        registry.register_loader("ndjson_file", |params| {
            Ok(Arc::new(NdjsonLoader::from_params(params)?))
        });
        registry
    }

    /// Register an extractor constructor under a type identifier
    pub fn register_extractor<F>(&mut self, type_id: impl Into<String>, ctor: F)
    where
        F: Fn(Value) -> Result<Arc<dyn Extractor>> + Send + Sync + 'static,
    {
        self.extractors.insert(type_id.into(), Box::new(ctor));
    }

    /// Register a transformer constructor under a type identifier
    pub fn register_transformer<F>(&mut self, type_id: impl Into<String>, ctor: F)
    where
        F: Fn(Value) -> Result<Arc<dyn Transformer>> + Send + Sync + 'static,
    {
        self.transformers.insert(type_id.into(), Box::new(ctor));
    }

    /// Register a loader constructor under a type identifier
    pub fn register_loader<F>(&mut self, type_id: impl Into<String>, ctor: F)
    where
        F: Fn(Value) -> Result<Arc<dyn Loader>> + Send + Sync + 'static,
    {
        self.loaders.insert(type_id.into(), Box::new(ctor));
    }

    /// Look up the constructor for an extractor type
    pub fn resolve_extractor(&self, type_id: &str) -> Option<&ExtractorCtor> {
        self.extractors.get(type_id)
    }

    /// Look up the constructor for a transformer type
    pub fn resolve_transformer(&self, type_id: &str) -> Option<&TransformerCtor> {
        self.transformers.get(type_id)
    }

    /// Look up the constructor for a loader type
    pub fn resolve_loader(&self, type_id: &str) -> Option<&LoaderCtor> {
        self.loaders.get(type_id)
    }

    /// Registered extractor type identifiers, sorted
    pub fn extractor_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Registered transformer type identifiers, sorted
    pub fn transformer_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Registered loader type identifiers, sorted
    pub fn loader_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        registry.register_transformer("noop", |_params| Ok(Arc::new(Passthrough::new())));

        assert!(registry.resolve_transformer("noop").is_some());
        assert!(registry.resolve_transformer("missing").is_none());
        assert!(registry.resolve_extractor("noop").is_none());
    }

    #[test]
    fn test_reregistration_replaces_the_constructor() {
        let mut registry = ComponentRegistry::new();
        registry.register_extractor("probe", |_params| {
            Ok(Arc::new(MemoryExtractor::new(Vec::new())))
        });
        registry.register_extractor("probe", |_params| {
            Err(eyre::eyre!("second registration"))
        });

        let ctor = registry.resolve_extractor("probe").unwrap();
        let error = ctor(json!({})).unwrap_err();
        assert!(error.to_string().contains("second registration"));
    }

    #[test]
    fn test_builtin_types_are_listed_sorted() {
        let registry = ComponentRegistry::with_builtins();

        assert_eq!(
            registry.extractor_types(),
            vec!["csv_file", "memory", "ndjson_file"]
        );
        assert_eq!(
            registry.transformer_types(),
            vec!["drop_fields", "passthrough"]
        );
        assert_eq!(registry.loader_types(), vec!["csv_buffer", "ndjson_file"]);
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let registry = ComponentRegistry::with_builtins();

        assert!(registry.resolve_extractor("ndjson_file").is_some());
        assert!(registry.resolve_loader("ndjson_file").is_some());
        assert!(registry.resolve_transformer("ndjson_file").is_none());
    }

    #[test]
    fn test_builtin_constructor_rejects_bad_params() {
        let registry = ComponentRegistry::with_builtins();
        let ctor = registry.resolve_extractor("csv_file").unwrap();

        let error = ctor(json!({"path": 42})).unwrap_err();
        assert!(!error.to_string().is_empty());
    }
}
