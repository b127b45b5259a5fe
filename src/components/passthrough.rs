//! Identity transformer

use crate::etl::{Batch, Transformer};
use async_trait::async_trait;
use eyre::Result;
use serde_json::Value;

/// Transformer that returns its input unchanged
///
/// Useful as a merge point: give it several `depends_on` entries and its
/// output is their concatenation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Passthrough {
    pub fn new() -> Self {
        Self
    }

    /// Construct from description params (none are accepted)
    pub fn from_params(_params: Value) -> Result<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl Transformer for Passthrough {
    async fn transform(&self, batch: Batch) -> Result<Batch> {
        Ok(batch)
    }
}
