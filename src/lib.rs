//! Flowline
//!
//! A pluggable async ETL pipeline engine: named extractors fan out
//! concurrently, transformers run as a dependency graph, and loaders fan
//! out over the final batch. Pipelines are assembled in code or from
//! declarative YAML descriptions.
//!
//! # Example
//! ```no_run
//! use flowline::{ComponentRegistry, PipelineDescription, PipelineFactory};
//!
//! # async fn example() -> eyre::Result<()> {
//! let description = PipelineDescription::read("pipeline.yml")?;
//! let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
//! let pipeline = factory.build(&description)?;
//!
//! let summary = pipeline.run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod components;
pub mod description;
pub mod error;
pub mod etl;
pub mod factory;
pub mod registry;

// Re-exports for convenience
pub use description::{PipelineDescription, StageSpec, TransformSpec};
pub use error::{
    BuildError, BuildReport, DescriptionError, PipelineError, RunPhase, StageError, StageKind,
};
pub use etl::{Artifact, Batch, Extractor, Loader, Pipeline, Record, RunSummary, Transformer};
pub use factory::PipelineFactory;
pub use registry::ComponentRegistry;
