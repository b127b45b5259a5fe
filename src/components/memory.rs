//! In-memory extraction, mainly for seeding pipelines in tests and demos

use crate::etl::{Batch, Extractor};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Extractor that yields a fixed set of records
///
/// # Example
/// ```
/// use flowline::components::MemoryExtractor;
/// use flowline::etl::Extractor;
/// use serde_json::json;
///
/// # async fn example() -> eyre::Result<()> {
/// let extractor = MemoryExtractor::new(vec![json!({"n": 1})]);
/// assert_eq!(extractor.extract().await?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MemoryExtractor {
    records: Batch,
}

#[derive(Deserialize)]
struct MemoryExtractorParams {
    #[serde(default)]
    records: Batch,
}

impl MemoryExtractor {
    /// Create an extractor over the given records
    pub fn new(records: Batch) -> Self {
        Self { records }
    }

    /// Construct from description params: optional `records` list
    pub fn from_params(params: Value) -> Result<Self> {
        let params: MemoryExtractorParams =
            serde_json::from_value(params).with_context(|| "Invalid memory extractor params")?;
        Ok(Self::new(params.records))
    }
}

#[async_trait]
impl Extractor for MemoryExtractor {
    async fn extract(&self) -> Result<Batch> {
        Ok(self.records.clone())
    }
}
