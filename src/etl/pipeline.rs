//! Pipeline orchestration for ETL operations

use super::graph::TransformGraph;
use super::{Artifact, Batch, Extractor, Loader, Transformer};
use crate::error::{BuildReport, PipelineError, RunPhase, StageError, StageKind};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};

/// Outcome of one transformer node, published through its cell
type BranchOutcome = Result<Arc<Batch>, StageError>;

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records in the combined extraction batch
    pub records_extracted: usize,
    /// Records in the final batch handed to every loader
    pub records_loaded: usize,
    /// Number of loaders that ran
    pub loaders_run: usize,
    /// Artifacts returned by loaders that produced one, by loader name
    pub artifacts: BTreeMap<String, Artifact>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted {} record(s), loaded {} record(s) into {} destination(s) in {:.2?}",
            self.records_extracted, self.records_loaded, self.loaders_run, self.elapsed
        )
    }
}

/// ETL pipeline holding named stage collections and a transformer
/// dependency map
///
/// A pipeline is assembled once and run any number of times. Each `run`:
///
/// 1. invokes every extractor concurrently and concatenates their batches
///    in name order,
/// 2. schedules transformers as a dependency graph: nodes without
///    dependencies consume the combined extraction batch, nodes with
///    dependencies consume their dependencies' concatenated outputs, and
///    independent branches run concurrently,
/// 3. invokes every loader concurrently with the identical final batch
///    (the concatenated outputs of the terminal transformers).
///
/// The stage collections are read-only after construction; a run keeps its
/// working state on the stack, so concurrent runs of one pipeline are safe
/// whenever the contained components tolerate them.
///
/// # Example
/// ```no_run
/// use flowline::components::{CsvExtractor, NdjsonLoader, Passthrough};
/// use flowline::etl::{Extractor, Loader, Pipeline, Transformer};
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
///
/// # async fn example() -> eyre::Result<()> {
/// let mut extractors: BTreeMap<String, Arc<dyn Extractor>> = BTreeMap::new();
/// extractors.insert("people".into(), Arc::new(CsvExtractor::new("people.csv")));
///
/// let mut transformers: BTreeMap<String, Arc<dyn Transformer>> = BTreeMap::new();
/// transformers.insert("clean".into(), Arc::new(Passthrough::new()));
///
/// let mut loaders: BTreeMap<String, Arc<dyn Loader>> = BTreeMap::new();
/// loaders.insert("out".into(), Arc::new(NdjsonLoader::new("people.ndjson")));
///
/// let pipeline = Pipeline::new(extractors, transformers, loaders, BTreeMap::new())?;
/// let summary = pipeline.run().await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline {
    extractors: BTreeMap<String, Arc<dyn Extractor>>,
    transformers: BTreeMap<String, Arc<dyn Transformer>>,
    loaders: BTreeMap<String, Arc<dyn Loader>>,
    graph: TransformGraph,
}

impl Pipeline {
    /// Assemble a pipeline from named stage collections and a transformer
    /// dependency map
    ///
    /// Dependency edges are validated here: every referenced name must be a
    /// declared transformer and the graph must be acyclic.
    ///
    /// # Errors
    /// Returns every graph violation found, never just the first.
    pub fn new(
        extractors: BTreeMap<String, Arc<dyn Extractor>>,
        transformers: BTreeMap<String, Arc<dyn Transformer>>,
        loaders: BTreeMap<String, Arc<dyn Loader>>,
        dependencies: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, BuildReport> {
        let graph =
            TransformGraph::resolve(transformers.keys(), &dependencies).map_err(BuildReport::new)?;
        Ok(Self {
            extractors,
            transformers,
            loaders,
            graph,
        })
    }

    /// Run the complete pipeline
    ///
    /// Failure policy per phase:
    /// - extract: fail fast; the first failure cancels outstanding
    ///   extractors and is surfaced alone
    /// - transform: a failing node takes down only its transitive
    ///   dependents; independent branches complete, then every collected
    ///   failure is reported
    /// - load: all loaders start; the first failure cancels still-running
    ///   siblings and every observed failure is reported
    ///
    /// # Errors
    /// Returns the phase that stopped the run and the stage failures
    /// collected under that phase's policy.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        log::info!(
            "Starting pipeline run: {} extractor(s), {} transformer(s), {} loader(s)",
            self.extractors.len(),
            self.transformers.len(),
            self.loaders.len()
        );

        log::debug!("Extracting from {} source(s)...", self.extractors.len());
        let extracted = self.extract_all().await?;
        let records_extracted = extracted.len();
        if records_extracted == 0 {
            log::warn!("No records extracted");
        }
        log::info!("✓ Extracted {records_extracted} record(s)");

        log::debug!("Scheduling {} transformer(s)...", self.transformers.len());
        let transformed = self.transform_all(extracted).await?;
        let records_loaded = transformed.len();
        log::info!("✓ Transformed into {records_loaded} record(s)");

        log::debug!("Loading {} destination(s)...", self.loaders.len());
        let artifacts = self.load_all(transformed).await?;
        log::info!(
            "✓ Loaded {records_loaded} record(s) into {} destination(s)",
            self.loaders.len()
        );

        Ok(RunSummary {
            records_extracted,
            records_loaded,
            loaders_run: self.loaders.len(),
            artifacts,
            elapsed: started.elapsed(),
        })
    }

    /// Run every extractor concurrently; concatenate outputs in name order
    async fn extract_all(&self) -> Result<Batch, PipelineError> {
        let mut tasks: JoinSet<(usize, Result<Batch, StageError>)> = JoinSet::new();
        let mut stage_names: HashMap<Id, String> = HashMap::new();
        for (index, (name, extractor)) in self.extractors.iter().enumerate() {
            let stage = name.clone();
            let extractor = Arc::clone(extractor);
            let handle = tasks.spawn(async move {
                let result = extractor
                    .extract()
                    .await
                    .map_err(|cause| StageError::component(StageKind::Extractor, stage, cause));
                (index, result)
            });
            stage_names.insert(handle.id(), name.clone());
        }

        let mut outputs: Vec<Option<Batch>> = Vec::new();
        outputs.resize_with(self.extractors.len(), || None);
        let mut failure: Option<StageError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(batch))) => {
                    if let Some(slot) = outputs.get_mut(index) {
                        *slot = Some(batch);
                    }
                }
                Ok((_, Err(error))) => {
                    if failure.is_none() {
                        log::error!("{error}");
                        tasks.abort_all();
                        failure = Some(error);
                    }
                }
                Err(join_error) => {
                    if failure.is_none() && !join_error.is_cancelled() {
                        let stage = stage_names
                            .get(&join_error.id())
                            .cloned()
                            .unwrap_or_default();
                        tasks.abort_all();
                        failure = Some(StageError::component(
                            StageKind::Extractor,
                            stage,
                            eyre::eyre!("extractor task did not complete: {join_error}"),
                        ));
                    }
                }
            }
        }

        if let Some(failure) = failure {
            return Err(PipelineError::new(RunPhase::Extract, vec![failure]));
        }

        let mut combined = Batch::new();
        for batch in outputs.into_iter().flatten() {
            combined.extend(batch);
        }
        Ok(combined)
    }

    /// Run the transformer graph; returns the merged terminal output
    async fn transform_all(&self, extracted: Batch) -> Result<Batch, PipelineError> {
        if self.transformers.is_empty() {
            return Ok(extracted);
        }

        let input = Arc::new(extracted);

        // One write-once cell per node; dependents suspend on these.
        let mut cells: Vec<watch::Sender<Option<BranchOutcome>>> = Vec::new();
        let mut receivers: BTreeMap<String, watch::Receiver<Option<BranchOutcome>>> =
            BTreeMap::new();
        for name in self.transformers.keys() {
            let (tx, rx) = watch::channel(None);
            cells.push(tx);
            receivers.insert(name.clone(), rx);
        }

        let mut tasks: JoinSet<()> = JoinSet::new();
        for ((name, transformer), tx) in self.transformers.iter().zip(cells) {
            let dependencies: Vec<(String, watch::Receiver<Option<BranchOutcome>>)> = self
                .graph
                .dependencies_of(name)
                .iter()
                .map(|dependency| (dependency.clone(), receivers[dependency].clone()))
                .collect();
            let name = name.clone();
            let transformer = Arc::clone(transformer);
            let input = Arc::clone(&input);
            tasks.spawn(async move {
                let outcome = run_node(name, transformer, dependencies, input).await;
                let _ = tx.send(Some(outcome));
            });
        }

        // Independent branches always run to completion, so no aborts here.
        while let Some(joined) = tasks.join_next().await {
            if let Err(join_error) = joined {
                if !join_error.is_cancelled() {
                    log::error!("Transformer task did not complete: {join_error}");
                }
            }
        }

        let mut outputs: BTreeMap<&str, Arc<Batch>> = BTreeMap::new();
        let mut failures: Vec<StageError> = Vec::new();
        for (name, rx) in &receivers {
            match rx.borrow().clone() {
                Some(Ok(batch)) => {
                    outputs.insert(name.as_str(), batch);
                }
                Some(Err(failure)) => failures.push(failure),
                // Cell never written: the node's task panicked before publishing.
                None => failures.push(StageError::component(
                    StageKind::Transformer,
                    name.clone(),
                    eyre::eyre!("transformer task ended without publishing output"),
                )),
            }
        }

        if !failures.is_empty() {
            return Err(PipelineError::new(RunPhase::Transform, failures));
        }

        let mut merged = Batch::new();
        for name in self.graph.terminals() {
            if let Some(batch) = outputs.get(name.as_str()) {
                merged.extend(batch.iter().cloned());
            }
        }
        Ok(merged)
    }

    /// Run every loader concurrently with the identical final batch
    async fn load_all(
        &self,
        batch: Batch,
    ) -> Result<BTreeMap<String, Artifact>, PipelineError> {
        let shared = Arc::new(batch);
        let mut tasks: JoinSet<(String, Result<Option<Artifact>, StageError>)> = JoinSet::new();
        let mut stage_names: HashMap<Id, String> = HashMap::new();
        for (name, loader) in &self.loaders {
            let stage = name.clone();
            let loader = Arc::clone(loader);
            let shared = Arc::clone(&shared);
            let handle = tasks.spawn(async move {
                let result = loader
                    .load(shared.as_ref().clone())
                    .await
                    .map_err(|cause| {
                        StageError::component(StageKind::Loader, stage.clone(), cause)
                    });
                (stage, result)
            });
            stage_names.insert(handle.id(), name.clone());
        }

        let mut artifacts = BTreeMap::new();
        let mut failures: Vec<StageError> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(Some(artifact)))) => {
                    artifacts.insert(name, artifact);
                }
                Ok((_, Ok(None))) => {}
                Ok((_, Err(error))) => {
                    log::error!("{error}");
                    if failures.is_empty() {
                        tasks.abort_all();
                    }
                    failures.push(error);
                }
                Err(join_error) => {
                    if !join_error.is_cancelled() {
                        let stage = stage_names
                            .get(&join_error.id())
                            .cloned()
                            .unwrap_or_default();
                        if failures.is_empty() {
                            tasks.abort_all();
                        }
                        failures.push(StageError::component(
                            StageKind::Loader,
                            stage,
                            eyre::eyre!("loader task did not complete: {join_error}"),
                        ));
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(artifacts)
        } else {
            failures.sort_by(|a, b| a.stage().cmp(b.stage()));
            Err(PipelineError::new(RunPhase::Load, failures))
        }
    }
}

/// Execute one transformer node: wait for its declared dependencies, build
/// its input from their outputs, then run the transform
async fn run_node(
    name: String,
    transformer: Arc<dyn Transformer>,
    mut dependencies: Vec<(String, watch::Receiver<Option<BranchOutcome>>)>,
    extracted: Arc<Batch>,
) -> BranchOutcome {
    let mut upstream: Vec<Arc<Batch>> = Vec::with_capacity(dependencies.len());
    for (dependency, rx) in &mut dependencies {
        match await_cell(dependency, rx).await {
            Ok(batch) => upstream.push(batch),
            Err(failure) => {
                log::warn!("Transformer '{name}' skipped: dependency '{dependency}' failed");
                let origin = failure.origin().clone();
                return Err(StageError::DependencyFailed {
                    name,
                    dependency: dependency.clone(),
                    cause: Arc::new(origin),
                });
            }
        }
    }

    let input: Batch = if upstream.is_empty() {
        extracted.as_ref().clone()
    } else {
        upstream
            .iter()
            .flat_map(|batch| batch.iter().cloned())
            .collect()
    };

    log::debug!("Transformer '{name}' processing {} record(s)", input.len());
    match transformer.transform(input).await {
        Ok(output) => Ok(Arc::new(output)),
        Err(cause) => Err(StageError::component(StageKind::Transformer, name, cause)),
    }
}

/// Suspend until a node's cell is written, then return that node's outcome
///
/// A closed or empty cell means the producing task panicked before
/// publishing; that counts as a failure of the producing node.
async fn await_cell(
    dependency: &str,
    rx: &mut watch::Receiver<Option<BranchOutcome>>,
) -> BranchOutcome {
    let unpublished = || {
        Err(StageError::component(
            StageKind::Transformer,
            dependency,
            eyre::eyre!("transformer task ended without publishing output"),
        ))
    };
    match rx.wait_for(|value| value.is_some()).await {
        Ok(ready) => ready.clone().unwrap_or_else(unpublished),
        Err(_) => unpublished(),
    }
}
