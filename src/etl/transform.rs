//! Transformer trait for data transformation

use super::Batch;
use async_trait::async_trait;
use eyre::Result;

/// Transformer trait for reshaping a batch of records
///
/// Implementors define how to rework a batch:
/// - Data cleaning (removing fields)
/// - Data enrichment (adding fields)
/// - Filtering or validation
///
/// A transformer's input is either the combined extraction output or, when
/// it declares dependencies, the concatenated outputs of those dependencies.
/// It must not rely on any ordering among *other* transformers beyond what
/// its declared dependencies guarantee.
///
/// # Example
/// ```
/// use flowline::etl::{Batch, Transformer};
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct KeepObjects;
///
/// #[async_trait]
/// impl Transformer for KeepObjects {
///     async fn transform(&self, batch: Batch) -> Result<Batch> {
///         Ok(batch.into_iter().filter(|record| record.is_object()).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transform a batch of records into a new batch
    ///
    /// # Errors
    /// Returns an error if transformation fails (validation, conversion, etc.)
    async fn transform(&self, batch: Batch) -> Result<Batch>;
}

impl std::fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Transformer")
    }
}
