//! Pipeline assembly from declarative descriptions
//!
//! The factory resolves every stage's type identifier against a
//! [`ComponentRegistry`], checks the transformer dependency graph, and
//! only then constructs components. Validation runs to completion so a
//! description with several problems reports all of them at once.

use crate::description::PipelineDescription;
use crate::error::{BuildError, BuildReport, StageKind};
use crate::etl::graph::TransformGraph;
use crate::etl::{Extractor, Loader, Pipeline, Transformer};
use crate::registry::ComponentRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds runnable [`Pipeline`]s from [`PipelineDescription`]s
///
/// # Example
/// ```
/// use flowline::{ComponentRegistry, PipelineDescription, PipelineFactory};
///
/// # fn main() -> eyre::Result<()> {
/// let description = PipelineDescription::parse(
///     "transformers:\n  noop:\n    type: passthrough\n",
/// )?;
/// let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
/// let pipeline = factory.build(&description)?;
/// # let _ = pipeline;
/// # Ok(())
/// # }
/// ```
pub struct PipelineFactory {
    registry: ComponentRegistry,
}

impl PipelineFactory {
    /// Create a factory backed by the given registry
    pub fn new(registry: ComponentRegistry) -> Self {
        Self { registry }
    }

    /// The registry this factory resolves type identifiers against
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Validate a description without constructing any component
    ///
    /// Checks, in order: every declared type identifier resolves in the
    /// registry, every dependency edge references a declared transformer,
    /// and the dependency graph is acyclic.
    ///
    /// # Errors
    /// Returns every violation found, never just the first.
    pub fn validate(&self, description: &PipelineDescription) -> Result<(), BuildReport> {
        let errors = self.collect_violations(description);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BuildReport::new(errors))
        }
    }

    /// Build a runnable pipeline from a description
    ///
    /// Each stage's constructor receives that stage's `params` value.
    /// Constructor failures are collected across all stages, so one bad
    /// `params` block does not mask another.
    ///
    /// # Errors
    /// Returns the same validation report as [`validate`](Self::validate),
    /// or every constructor rejection when validation passed. A failed
    /// build never yields a partially constructed pipeline.
    pub fn build(&self, description: &PipelineDescription) -> Result<Pipeline, BuildReport> {
        self.validate(description)?;
        log::debug!(
            "Constructing {} stage(s) from description",
            description.stage_count()
        );

        let mut errors: Vec<BuildError> = Vec::new();

        let mut extractors: BTreeMap<String, Arc<dyn Extractor>> = BTreeMap::new();
        for (name, spec) in &description.extractors {
            // validate() guaranteed every type identifier resolves
            let Some(ctor) = self.registry.resolve_extractor(&spec.type_id) else {
                continue;
            };
            match ctor(spec.params.clone()) {
                Ok(extractor) => {
                    extractors.insert(name.clone(), extractor);
                }
                Err(cause) => errors.push(BuildError::Construction {
                    kind: StageKind::Extractor,
                    stage: name.clone(),
                    cause,
                }),
            }
        }

        let mut transformers: BTreeMap<String, Arc<dyn Transformer>> = BTreeMap::new();
        for (name, spec) in &description.transformers {
            let Some(ctor) = self.registry.resolve_transformer(&spec.type_id) else {
                continue;
            };
            match ctor(spec.params.clone()) {
                Ok(transformer) => {
                    transformers.insert(name.clone(), transformer);
                }
                Err(cause) => errors.push(BuildError::Construction {
                    kind: StageKind::Transformer,
                    stage: name.clone(),
                    cause,
                }),
            }
        }

        let mut loaders: BTreeMap<String, Arc<dyn Loader>> = BTreeMap::new();
        for (name, spec) in &description.loaders {
            let Some(ctor) = self.registry.resolve_loader(&spec.type_id) else {
                continue;
            };
            match ctor(spec.params.clone()) {
                Ok(loader) => {
                    loaders.insert(name.clone(), loader);
                }
                Err(cause) => errors.push(BuildError::Construction {
                    kind: StageKind::Loader,
                    stage: name.clone(),
                    cause,
                }),
            }
        }

        if !errors.is_empty() {
            return Err(BuildReport::new(errors));
        }

        Pipeline::new(extractors, transformers, loaders, description.dependency_map())
    }

    fn collect_violations(&self, description: &PipelineDescription) -> Vec<BuildError> {
        let mut errors = Vec::new();

        for (name, spec) in &description.extractors {
            if self.registry.resolve_extractor(&spec.type_id).is_none() {
                errors.push(BuildError::UnknownType {
                    kind: StageKind::Extractor,
                    stage: name.clone(),
                    type_id: spec.type_id.clone(),
                });
            }
        }
        for (name, spec) in &description.transformers {
            if self.registry.resolve_transformer(&spec.type_id).is_none() {
                errors.push(BuildError::UnknownType {
                    kind: StageKind::Transformer,
                    stage: name.clone(),
                    type_id: spec.type_id.clone(),
                });
            }
        }
        for (name, spec) in &description.loaders {
            if self.registry.resolve_loader(&spec.type_id).is_none() {
                errors.push(BuildError::UnknownType {
                    kind: StageKind::Loader,
                    stage: name.clone(),
                    type_id: spec.type_id.clone(),
                });
            }
        }

        if let Err(graph_errors) = TransformGraph::resolve(
            description.transformers.keys(),
            &description.dependency_map(),
        ) {
            errors.extend(graph_errors);
        }

        errors
    }
}
