//! Extractor trait for data extraction from various sources

use super::Batch;
use async_trait::async_trait;
use eyre::Result;

/// Extractor trait for pulling a batch of records out of a source
///
/// Implementors define how to extract records from sources like:
/// - File systems (CSV, NDJSON)
/// - Databases
/// - In-memory fixtures
///
/// Extractors are held as trait objects in a pipeline's stage map, so the
/// trait is object-safe and every implementation speaks plain JSON records.
///
/// # Example
/// ```no_run
/// use flowline::etl::{Batch, Extractor};
/// use async_trait::async_trait;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct FileExtractor {
///     path: PathBuf,
/// }
///
/// #[async_trait]
/// impl Extractor for FileExtractor {
///     async fn extract(&self) -> Result<Batch> {
///         // Read the file and return its records
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract a batch of records from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, I/O, parsing, etc.)
    async fn extract(&self) -> Result<Batch>;
}

impl std::fmt::Debug for dyn Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Extractor")
    }
}
