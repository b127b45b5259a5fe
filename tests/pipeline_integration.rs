//! Integration tests for pipeline assembly and execution
//!
//! These tests exercise complete workflows: descriptions written to and
//! read from disk, factories resolving built-in and custom component
//! types, and pipelines doing real file I/O.

use async_trait::async_trait;
use eyre::Result;
use flowline::components::{CsvBufferLoader, MemoryExtractor, Passthrough};
use flowline::etl::{Artifact, Batch, Extractor, Loader, Pipeline, Transformer};
use flowline::{ComponentRegistry, PipelineDescription, PipelineFactory, StageSpec, TransformSpec};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Transformer that stamps every object record with a source tag
struct SourceTagger {
    tag: String,
}

#[async_trait]
impl Transformer for SourceTagger {
    async fn transform(&self, mut batch: Batch) -> Result<Batch> {
        for record in &mut batch {
            if let Some(object) = record.as_object_mut() {
                object.insert("source".to_string(), json!(self.tag));
            }
        }
        Ok(batch)
    }
}

#[tokio::test]
async fn test_in_memory_csv_pipeline_renders_exact_bytes() -> Result<()> {
    let sink = CsvBufferLoader::new();

    let mut extractors: BTreeMap<String, Arc<dyn Extractor>> = BTreeMap::new();
    extractors.insert(
        "people".into(),
        Arc::new(MemoryExtractor::new(vec![
            json!({"Name": "Alice", "Age": "30"}),
            json!({"Name": "Bob", "Age": "25"}),
        ])),
    );

    let mut transformers: BTreeMap<String, Arc<dyn Transformer>> = BTreeMap::new();
    transformers.insert("identity".into(), Arc::new(Passthrough::new()));

    let mut loaders: BTreeMap<String, Arc<dyn Loader>> = BTreeMap::new();
    loaders.insert("buffer".into(), Arc::new(sink.clone()));

    let pipeline = Pipeline::new(extractors, transformers, loaders, BTreeMap::new())?;
    let summary = pipeline.run().await?;

    assert_eq!(summary.records_extracted, 2);
    assert_eq!(summary.records_loaded, 2);
    assert_eq!(
        sink.contents(),
        b"Name,Age\r\nAlice,30\r\nBob,25\r\n",
        "CSV output must keep column order and use CRLF line endings"
    );

    Ok(())
}

#[tokio::test]
async fn test_yaml_description_round_trips_and_runs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let csv_path = temp_dir.path().join("people.csv");
    let output_path = temp_dir.path().join("out").join("people.ndjson");
    let description_path = temp_dir.path().join("pipeline.yml");

    std::fs::write(
        &csv_path,
        "Name,Age,Ssn\nAlice,30,000-00-0000\nBob,25,111-11-1111\n",
    )?;

    let mut description = PipelineDescription::new();
    description.extractors.insert(
        "people".into(),
        StageSpec::with_params("csv_file", json!({"path": csv_path})),
    );
    description.transformers.insert(
        "clean".into(),
        TransformSpec::with_params("drop_fields", json!({"fields": ["Ssn"]})),
    );
    description.loaders.insert(
        "out".into(),
        StageSpec::with_params("ndjson_file", json!({"path": output_path})),
    );
    description.write(&description_path)?;

    let loaded = PipelineDescription::read(&description_path)?;
    assert_eq!(loaded, description, "description should survive the disk trip");

    let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
    let pipeline = factory.build(&loaded)?;
    let summary = pipeline.run().await?;

    assert_eq!(summary.records_extracted, 2);
    assert_eq!(summary.records_loaded, 2);
    assert_eq!(
        summary.artifacts.get("out"),
        Some(&Artifact::Location(output_path.display().to_string()))
    );

    let content = std::fs::read_to_string(&output_path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "Output file should have 2 lines");
    for line in lines {
        let record: Value = serde_json::from_str(line)?;
        let object = record.as_object().unwrap();
        assert!(!object.contains_key("Ssn"), "Ssn should be dropped");
        assert!(object.contains_key("Name"));
    }

    Ok(())
}

#[tokio::test]
async fn test_dependent_transformer_merges_in_declared_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("merged.ndjson");

    // "left" and "right" both consume the extraction batch; "merge"
    // declares right before left, so its input and therefore the final
    // output must follow that order rather than name order.
    let mut description = PipelineDescription::new();
    description.extractors.insert(
        "seed".into(),
        StageSpec::with_params("memory", json!({"records": [{"a": 1, "b": 2}]})),
    );
    description.transformers.insert(
        "left".into(),
        TransformSpec::with_params("drop_fields", json!({"fields": ["b"]})),
    );
    description.transformers.insert(
        "right".into(),
        TransformSpec::with_params("drop_fields", json!({"fields": ["a"]})),
    );
    description.transformers.insert(
        "merge".into(),
        TransformSpec::new("passthrough").with_depends_on(["right", "left"]),
    );
    description.loaders.insert(
        "out".into(),
        StageSpec::with_params("ndjson_file", json!({"path": output_path})),
    );

    let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
    let pipeline = factory.build(&description)?;
    let summary = pipeline.run().await?;

    assert_eq!(summary.records_loaded, 2);

    let content = std::fs::read_to_string(&output_path)?;
    let lines: Vec<Value> = content
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines, vec![json!({"b": 2}), json!({"a": 1})]);

    Ok(())
}

#[test]
fn test_factory_reports_every_violation_at_once() {
    let description = PipelineDescription::parse(
        r#"
extractors:
  src:
    type: mystery_source
transformers:
  a:
    type: passthrough
    depends_on: [b]
  b:
    type: passthrough
    depends_on: [a]
  orphan:
    type: passthrough
    depends_on: [ghost]
loaders:
  out:
    type: mystery_sink
"#,
    )
    .unwrap();

    let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
    let report = factory.validate(&description).unwrap_err();

    assert_eq!(report.errors.len(), 4, "{report}");
    let message = report.to_string();
    assert!(message.contains("mystery_source"));
    assert!(message.contains("mystery_sink"));
    assert!(message.contains("ghost"));
    assert!(message.contains("cycle"));
}

#[tokio::test]
async fn test_custom_component_type_runs_from_a_description() -> Result<()> {
    let mut registry = ComponentRegistry::with_builtins();
    registry.register_transformer("tag_source", |params| {
        let tag = params
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Ok(Arc::new(SourceTagger { tag }))
    });

    let description = PipelineDescription::parse(
        r#"
extractors:
  seed:
    type: memory
    params:
      records:
        - name: Alice
transformers:
  tag:
    type: tag_source
    params:
      tag: crm
loaders:
  out:
    type: csv_buffer
"#,
    )?;

    let factory = PipelineFactory::new(registry);
    let pipeline = factory.build(&description)?;
    let summary = pipeline.run().await?;

    assert_eq!(summary.records_loaded, 1);
    assert_eq!(summary.artifacts.get("out"), Some(&Artifact::Count(1)));

    Ok(())
}

#[tokio::test]
async fn test_failed_branch_surfaces_in_pipeline_error_display() -> Result<()> {
    let description = PipelineDescription::parse(
        r#"
extractors:
  seed:
    type: memory
    params:
      records:
        - name: Alice
transformers:
  broken:
    type: always_failing
  dependent:
    type: passthrough
    depends_on: [broken]
"#,
    )?;

    let mut registry = ComponentRegistry::with_builtins();
    registry.register_transformer("always_failing", |_params| Ok(Arc::new(AlwaysFailing)));

    let factory = PipelineFactory::new(registry);
    let pipeline = factory.build(&description)?;
    let error = pipeline.run().await.unwrap_err();

    let message = error.to_string();
    assert!(message.contains("transform phase failed"), "{message}");
    assert!(message.contains("broken"), "{message}");
    assert!(message.contains("dependent"), "{message}");

    Ok(())
}

/// Transformer that always fails, for exercising error reporting
struct AlwaysFailing;

#[async_trait]
impl Transformer for AlwaysFailing {
    async fn transform(&self, _batch: Batch) -> Result<Batch> {
        eyre::bail!("synthetic failure")
    }
}
