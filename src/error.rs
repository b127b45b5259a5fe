//! Error types for pipeline construction and execution
//!
//! Components themselves speak `eyre::Result`; the engine wraps their
//! failures into these typed errors so callers can tell which stage broke,
//! in which phase, and why. Build-time problems are always collected into a
//! single exhaustive [`BuildReport`] rather than surfaced one at a time.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The three kinds of pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Extractor,
    Transformer,
    Loader,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Extractor => "extractor",
            StageKind::Transformer => "transformer",
            StageKind::Loader => "loader",
        })
    }
}

/// One stage failure observed during a run
///
/// Failures are shared across dependent transformer branches, so the
/// component cause is reference-counted and the whole error is cheap to
/// clone.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// An extractor failed to produce its batch
    #[error("extractor '{name}' failed: {cause}")]
    Source { name: String, cause: Arc<eyre::Report> },

    /// A transformer failed while processing its input
    #[error("transformer '{name}' failed: {cause}")]
    Transform { name: String, cause: Arc<eyre::Report> },

    /// A loader failed to write the final batch
    #[error("loader '{name}' failed: {cause}")]
    Sink { name: String, cause: Arc<eyre::Report> },

    /// A transformer never ran because a declared dependency failed
    #[error("transformer '{name}' skipped: dependency '{dependency}' failed: {cause}")]
    DependencyFailed {
        name: String,
        dependency: String,
        /// The originating stage failure, never itself a skip
        cause: Arc<StageError>,
    },
}

impl StageError {
    /// Wrap a component failure in the error variant for its stage kind
    pub(crate) fn component(kind: StageKind, name: impl Into<String>, cause: eyre::Report) -> Self {
        let name = name.into();
        let cause = Arc::new(cause);
        match kind {
            StageKind::Extractor => StageError::Source { name, cause },
            StageKind::Transformer => StageError::Transform { name, cause },
            StageKind::Loader => StageError::Sink { name, cause },
        }
    }

    /// Name of the stage this failure belongs to
    pub fn stage(&self) -> &str {
        match self {
            StageError::Source { name, .. }
            | StageError::Transform { name, .. }
            | StageError::Sink { name, .. }
            | StageError::DependencyFailed { name, .. } => name,
        }
    }

    /// The originating failure; skip chains collapse to their root cause
    pub fn origin(&self) -> &StageError {
        match self {
            StageError::DependencyFailed { cause, .. } => cause.origin(),
            other => other,
        }
    }
}

/// Phase of a pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunPhase::Extract => "extract",
            RunPhase::Transform => "transform",
            RunPhase::Load => "load",
        })
    }
}

/// A failed pipeline run: the phase that could not continue and every stage
/// failure collected under that phase's failure policy
#[derive(Debug)]
pub struct PipelineError {
    pub phase: RunPhase,
    pub failures: Vec<StageError>,
}

impl PipelineError {
    pub(crate) fn new(phase: RunPhase, failures: Vec<StageError>) -> Self {
        Self { phase, failures }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} phase failed with {} error(s)",
            self.phase,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {}

/// One violation found while validating or building a pipeline description
#[derive(Debug, Error)]
pub enum BuildError {
    /// A declared type identifier has no registered constructor
    #[error("{kind} '{stage}' uses unknown type '{type_id}'")]
    UnknownType {
        kind: StageKind,
        stage: String,
        type_id: String,
    },

    /// A dependency edge references a transformer that is not declared
    #[error("transformer '{stage}' depends on undeclared transformer '{reference}'")]
    UnknownDependency { stage: String, reference: String },

    /// The dependency map has an entry for a transformer that is not declared
    #[error("dependency entry for undeclared transformer '{stage}'")]
    UnknownDependent { stage: String },

    /// The dependency graph contains a cycle
    #[error("transformer dependency cycle: {cycle}")]
    DependencyCycle { cycle: String },

    /// A constructor rejected its declared parameters
    #[error("failed to construct {kind} '{stage}': {cause}")]
    Construction {
        kind: StageKind,
        stage: String,
        cause: eyre::Report,
    },
}

/// Every violation found in one validation or build pass
///
/// Validation always runs to completion before failing, so a description
/// with three bad entries yields three entries here, not one at a time.
#[derive(Debug)]
pub struct BuildReport {
    pub errors: Vec<BuildError>,
}

impl BuildReport {
    pub(crate) fn new(errors: Vec<BuildError>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pipeline description has {} problem(s)",
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildReport {}

/// Failure to obtain a pipeline description from a document
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The document could not be read
    #[error("failed to read pipeline description '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid pipeline description
    #[error("malformed pipeline description '{path}'")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
