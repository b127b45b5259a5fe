//! Built-in pipeline components
//!
//! Every component here carries a `from_params` constructor that accepts
//! the JSON `params` block from a pipeline description, which is how
//! [`ComponentRegistry::with_builtins`](crate::registry::ComponentRegistry::with_builtins)
//! registers them. The plain constructors remain available for pipelines
//! assembled in code.

mod csv;
mod fields;
mod memory;
mod ndjson;
mod passthrough;

pub use csv::{CsvBufferLoader, CsvExtractor};
pub use fields::FieldDropper;
pub use memory::MemoryExtractor;
pub use ndjson::{NdjsonExtractor, NdjsonLoader};
pub use passthrough::Passthrough;
