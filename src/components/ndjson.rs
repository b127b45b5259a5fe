//! NDJSON (Newline Delimited JSON) file extraction and loading

use crate::etl::{Artifact, Batch, Extractor, Loader};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Extractor that reads an NDJSON file, one record per non-empty line
pub struct NdjsonExtractor {
    path: PathBuf,
}

#[derive(Deserialize)]
struct NdjsonParams {
    path: PathBuf,
}

impl NdjsonExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Construct from description params: `path`
    pub fn from_params(params: Value) -> Result<Self> {
        let params: NdjsonParams = serde_json::from_value(params)
            .with_context(|| "Invalid ndjson_file extractor params")?;
        Ok(Self::new(params.path))
    }
}

#[async_trait]
impl Extractor for NdjsonExtractor {
    async fn extract(&self) -> Result<Batch> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse JSON line: {}", line))
            })
            .collect()
    }
}

/// Loader that writes each record as one JSON line
///
/// Parent directories are created as needed; an existing file is replaced.
pub struct NdjsonLoader {
    path: PathBuf,
}

impl NdjsonLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Construct from description params: `path`
    pub fn from_params(params: Value) -> Result<Self> {
        let params: NdjsonParams =
            serde_json::from_value(params).with_context(|| "Invalid ndjson_file loader params")?;
        Ok(Self::new(params.path))
    }
}

#[async_trait]
impl Loader for NdjsonLoader {
    async fn load(&self, batch: Batch) -> Result<Option<Artifact>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }

        let ndjson = batch
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        // Add trailing newline
        let content = if ndjson.is_empty() {
            String::new()
        } else {
            format!("{}\n", ndjson)
        };

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write NDJSON file: {}", self.path.display()))?;

        log::debug!(
            "Wrote {} record(s) to {}",
            batch.len(),
            self.path.display()
        );
        Ok(Some(Artifact::Location(self.path.display().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[tokio::test]
    async fn test_load_then_extract_round_trips() {
        let temp = NamedTempFile::new().unwrap();
        let loader = NdjsonLoader::new(temp.path());

        let data = vec![json!({"a": 1}), json!({"b": 2})];
        let artifact = loader.load(data.clone()).await.unwrap();
        assert_eq!(
            artifact,
            Some(Artifact::Location(temp.path().display().to_string()))
        );

        let extractor = NdjsonExtractor::new(temp.path());
        assert_eq!(extractor.extract().await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_extract_skips_blank_lines() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{{\"a\": 1}}\n\n  \n{{\"b\": 2}}\n").unwrap();

        let extractor = NdjsonExtractor::new(temp.path());
        let batch = extractor.extract().await.unwrap();

        assert_eq!(batch, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[tokio::test]
    async fn test_extract_reports_the_bad_line() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{{\"a\": 1}}\nnot json\n").unwrap();

        let extractor = NdjsonExtractor::new(temp.path());
        let error = extractor.extract().await.unwrap_err();

        assert!(error.to_string().contains("not json"));
    }

    #[tokio::test]
    async fn test_load_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.ndjson");
        let loader = NdjsonLoader::new(&path);

        loader.load(vec![json!({"a": 1})]).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_empty_batch_writes_empty_file() {
        let temp = NamedTempFile::new().unwrap();
        let loader = NdjsonLoader::new(temp.path());

        loader.load(Vec::new()).await.unwrap();

        assert_eq!(std::fs::read_to_string(temp.path()).unwrap(), "");
    }
}
