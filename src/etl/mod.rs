//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the stage contracts for building data pipelines
//! and the [`Pipeline`] orchestrator that runs named stages with controlled
//! concurrency: extractors fan out, transformers run as a dependency-aware
//! graph, loaders fan out over the final merged batch.

mod extract;
pub(crate) mod graph;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::{Artifact, Loader};
pub use pipeline::{Pipeline, RunSummary};
pub use transform::Transformer;

/// A single unit of data moved by the engine.
///
/// Records are opaque to the engine; stages may put any JSON value in a
/// batch. Object key order is preserved end to end, so a delimited sink
/// reproduces its source's column order.
pub type Record = serde_json::Value;

/// An ordered sequence of records produced or consumed by one stage call.
pub type Batch = Vec<Record>;
