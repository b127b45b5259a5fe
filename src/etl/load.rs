//! Loader trait for loading data to destinations

use super::Batch;
use async_trait::async_trait;
use eyre::Result;
use std::fmt;

/// Handle to what a loader wrote, for destinations that have one to give
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Path or URI of the written output
    Location(String),
    /// Number of records accepted by the sink
    Count(usize),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Location(location) => write!(f, "{location}"),
            Artifact::Count(count) => write!(f, "{count} record(s)"),
        }
    }
}

/// Loader trait for writing records to a destination
///
/// Implementors define how to load records into destinations:
/// - File systems
/// - Databases
/// - In-memory buffers
///
/// Every loader in a pipeline receives the identical final batch; loaders
/// must not assume they are the only sink.
///
/// # Example
/// ```no_run
/// use flowline::etl::{Artifact, Batch, Loader};
/// use async_trait::async_trait;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct FileLoader {
///     path: PathBuf,
/// }
///
/// #[async_trait]
/// impl Loader for FileLoader {
///     async fn load(&self, batch: Batch) -> Result<Option<Artifact>> {
///         let lines: Vec<String> = batch.iter().map(|record| record.to_string()).collect();
///         std::fs::write(&self.path, lines.join("\n"))?;
///         Ok(Some(Artifact::Location(self.path.display().to_string())))
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load a batch of records into the destination
    ///
    /// Returns a handle to the written artifact when the destination has a
    /// meaningful one (a file path, a record count), `None` otherwise.
    ///
    /// # Errors
    /// Returns an error if loading fails (network, I/O, validation, etc.)
    async fn load(&self, batch: Batch) -> Result<Option<Artifact>>;
}

impl fmt::Debug for dyn Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Loader")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_display() {
        assert_eq!(
            Artifact::Location("out/data.ndjson".into()).to_string(),
            "out/data.ndjson"
        );
        assert_eq!(Artifact::Count(3).to_string(), "3 record(s)");
    }
}
