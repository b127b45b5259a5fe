//! CSV file extraction and in-memory CSV rendering

use crate::etl::{Artifact, Batch, Extractor, Loader, Record};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Extractor that reads a CSV file into one record per row
///
/// The first row names the columns; every field is extracted as a string
/// and record keys keep the column order of the file.
///
/// # Example
/// ```no_run
/// use flowline::components::CsvExtractor;
/// use flowline::etl::Extractor;
///
/// # async fn example() -> eyre::Result<()> {
/// let extractor = CsvExtractor::new("data/people.csv");
/// let records = extractor.extract().await?;
/// println!("read {} record(s)", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CsvExtractor {
    path: PathBuf,
    delimiter: u8,
}

#[derive(Deserialize)]
struct CsvExtractorParams {
    path: PathBuf,
    #[serde(default)]
    delimiter: Option<char>,
}

impl CsvExtractor {
    /// Create an extractor for a comma-delimited file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    /// Create an extractor with a custom delimiter
    pub fn with_delimiter(path: impl AsRef<Path>, delimiter: u8) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter,
        }
    }

    /// Construct from description params: `path`, optional `delimiter`
    pub fn from_params(params: Value) -> Result<Self> {
        let params: CsvExtractorParams = serde_json::from_value(params)
            .with_context(|| "Invalid csv_file extractor params")?;

        let mut extractor = Self::new(params.path);
        if let Some(delimiter) = params.delimiter {
            eyre::ensure!(
                delimiter.is_ascii(),
                "CSV delimiter must be a single ASCII character, got '{delimiter}'"
            );
            extractor.delimiter = delimiter as u8;
        }
        Ok(extractor)
    }
}

#[async_trait]
impl Extractor for CsvExtractor {
    async fn extract(&self) -> Result<Batch> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", self.path.display()))?
            .clone();

        let mut batch = Batch::new();
        for row in reader.records() {
            let row = row.with_context(|| {
                format!("Failed to read CSV record: {}", self.path.display())
            })?;
            let mut record = serde_json::Map::new();
            for (column, field) in headers.iter().zip(row.iter()) {
                record.insert(column.to_string(), Value::String(field.to_string()));
            }
            batch.push(Value::Object(record));
        }

        log::debug!(
            "Extracted {} record(s) from {}",
            batch.len(),
            self.path.display()
        );
        Ok(batch)
    }
}

/// Loader that renders records as CSV into a shared in-memory buffer
///
/// Columns come from the first record's keys, in order; later records are
/// projected onto those columns. Rows are terminated with CRLF. Clones
/// share the same buffer, so keep one clone outside the pipeline to read
/// the output back:
///
/// # Example
/// ```
/// use flowline::components::CsvBufferLoader;
/// use flowline::etl::Loader;
/// use serde_json::json;
///
/// # async fn example() -> eyre::Result<()> {
/// let sink = CsvBufferLoader::new();
/// sink.load(vec![json!({"Name": "Alice", "Age": "30"})]).await?;
/// assert_eq!(sink.contents(), b"Name,Age\r\nAlice,30\r\n");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CsvBufferLoader {
    buffer: Arc<Mutex<Vec<u8>>>,
    delimiter: u8,
}

impl Default for CsvBufferLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct CsvBufferLoaderParams {
    #[serde(default)]
    delimiter: Option<char>,
}

impl CsvBufferLoader {
    /// Create a loader with an empty buffer and comma delimiter
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            delimiter: b',',
        }
    }

    /// Create a loader with a custom delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            delimiter,
        }
    }

    /// Construct from description params: optional `delimiter`
    pub fn from_params(params: Value) -> Result<Self> {
        let params: CsvBufferLoaderParams = serde_json::from_value(params)
            .with_context(|| "Invalid csv_buffer loader params")?;

        let mut loader = Self::new();
        if let Some(delimiter) = params.delimiter {
            eyre::ensure!(
                delimiter.is_ascii(),
                "CSV delimiter must be a single ASCII character, got '{delimiter}'"
            );
            loader.delimiter = delimiter as u8;
        }
        Ok(loader)
    }

    /// Copy of everything loaded so far
    pub fn contents(&self) -> Vec<u8> {
        match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Loader for CsvBufferLoader {
    async fn load(&self, batch: Batch) -> Result<Option<Artifact>> {
        let count = batch.len();
        let columns: Vec<String> = batch
            .first()
            .and_then(Value::as_object)
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default();

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        if !columns.is_empty() {
            writer
                .write_record(&columns)
                .with_context(|| "Failed to write CSV header")?;
            for record in &batch {
                let fields: Vec<String> = columns
                    .iter()
                    .map(|column| render_field(record.get(column)))
                    .collect();
                writer
                    .write_record(&fields)
                    .with_context(|| "Failed to write CSV row")?;
            }
        }

        let bytes = writer
            .into_inner()
            .with_context(|| "Failed to flush CSV writer")?;

        let mut shared = match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        shared.extend_from_slice(&bytes);

        log::debug!("Rendered {count} record(s) as CSV ({} bytes)", bytes.len());
        Ok(Some(Artifact::Count(count)))
    }
}

/// Render one field for CSV output: strings verbatim, null and missing
/// values empty, everything else in JSON form
fn render_field(value: Option<&Record>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_extract_keeps_row_and_column_order() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "Name,Age\nAlice,30\nBob,25\n").unwrap();

        let extractor = CsvExtractor::new(temp.path());
        let batch = extractor.extract().await.unwrap();

        assert_eq!(
            batch,
            vec![
                json!({"Name": "Alice", "Age": "30"}),
                json!({"Name": "Bob", "Age": "25"}),
            ]
        );
        // Key order must match the file's column order
        assert_eq!(
            serde_json::to_string(&batch[0]).unwrap(),
            r#"{"Name":"Alice","Age":"30"}"#
        );
    }

    #[tokio::test]
    async fn test_extract_with_custom_delimiter() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "Name;Age\nAlice;30\n").unwrap();

        let extractor = CsvExtractor::with_delimiter(temp.path(), b';');
        let batch = extractor.extract().await.unwrap();

        assert_eq!(batch, vec![json!({"Name": "Alice", "Age": "30"})]);
    }

    #[tokio::test]
    async fn test_extract_missing_file_names_the_path() {
        let extractor = CsvExtractor::new("/definitely/not/here.csv");
        let error = extractor.extract().await.unwrap_err();

        assert!(error.to_string().contains("/definitely/not/here.csv"));
    }

    #[test]
    fn test_from_params_rejects_non_ascii_delimiter() {
        let error = CsvExtractor::from_params(json!({"path": "a.csv", "delimiter": "→"}))
            .unwrap_err();
        assert!(error.to_string().contains("ASCII"));
    }

    #[tokio::test]
    async fn test_load_renders_crlf_terminated_rows() {
        let sink = CsvBufferLoader::new();
        let artifact = sink
            .load(vec![
                json!({"Name": "Alice", "Age": "30"}),
                json!({"Name": "Bob", "Age": "25"}),
            ])
            .await
            .unwrap();

        assert_eq!(artifact, Some(Artifact::Count(2)));
        assert_eq!(sink.contents(), b"Name,Age\r\nAlice,30\r\nBob,25\r\n");
    }

    #[tokio::test]
    async fn test_load_empty_batch_writes_nothing() {
        let sink = CsvBufferLoader::new();
        let artifact = sink.load(Vec::new()).await.unwrap();

        assert_eq!(artifact, Some(Artifact::Count(0)));
        assert!(sink.contents().is_empty());
    }

    #[tokio::test]
    async fn test_load_renders_non_string_values() {
        let sink = CsvBufferLoader::new();
        sink.load(vec![json!({"n": 1, "ok": true, "note": null})])
            .await
            .unwrap();

        assert_eq!(sink.contents(), b"n,ok,note\r\n1,true,\r\n");
    }

    #[tokio::test]
    async fn test_later_records_are_projected_onto_first_columns() {
        let sink = CsvBufferLoader::new();
        sink.load(vec![
            json!({"a": "1", "b": "2"}),
            json!({"b": "4", "extra": "x"}),
        ])
        .await
        .unwrap();

        assert_eq!(sink.contents(), b"a,b\r\n1,2\r\n,4\r\n");
    }

    #[tokio::test]
    async fn test_clones_share_one_buffer() {
        let sink = CsvBufferLoader::new();
        let clone = sink.clone();

        clone.load(vec![json!({"n": "1"})]).await.unwrap();

        assert_eq!(sink.contents(), clone.contents());
        assert!(!sink.contents().is_empty());
    }
}
