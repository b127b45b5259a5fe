//! Field dropper transformer

use crate::etl::{Batch, Transformer};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Transformer that drops named fields from every object record
///
/// Records that are not objects pass through untouched.
///
/// # Example
/// ```
/// use flowline::components::FieldDropper;
/// use flowline::etl::Transformer;
/// use serde_json::json;
///
/// # async fn example() -> eyre::Result<()> {
/// let dropper = FieldDropper::new(vec!["ssn".to_string()]);
/// let output = dropper
///     .transform(vec![json!({"name": "Alice", "ssn": "000-00-0000"})])
///     .await?;
///
/// assert_eq!(output, vec![json!({"name": "Alice"})]);
/// # Ok(())
/// # }
/// ```
pub struct FieldDropper {
    fields: Vec<String>,
}

#[derive(Deserialize)]
struct FieldDropperParams {
    fields: Vec<String>,
}

impl FieldDropper {
    /// Create a dropper for the given field names
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Construct from description params: `fields` list
    pub fn from_params(params: Value) -> Result<Self> {
        let params: FieldDropperParams =
            serde_json::from_value(params).with_context(|| "Invalid drop_fields params")?;
        Ok(Self::new(params.fields))
    }
}

#[async_trait]
impl Transformer for FieldDropper {
    async fn transform(&self, mut batch: Batch) -> Result<Batch> {
        for record in &mut batch {
            if let Some(object) = record.as_object_mut() {
                for field in &self.fields {
                    object.remove(field);
                }
            }
        }
        Ok(batch)
    }
}
