//! Transformer dependency graph validation and resolution

use crate::error::BuildError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A validated transformer dependency graph
///
/// Holds every transformer's declared dependencies in declaration order plus
/// the terminal set (transformers no other transformer depends on) in name
/// order. Construction rejects unknown references and cycles, collecting
/// every violation before failing.
#[derive(Debug, Clone)]
pub(crate) struct TransformGraph {
    dependencies: BTreeMap<String, Vec<String>>,
    terminals: Vec<String>,
}

impl TransformGraph {
    /// Validate declared dependency edges against the set of transformer
    /// names and resolve the graph
    pub(crate) fn resolve<'a>(
        names: impl IntoIterator<Item = &'a String>,
        declared: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, Vec<BuildError>> {
        let names: BTreeSet<&str> = names.into_iter().map(String::as_str).collect();
        let mut errors = Vec::new();

        // Every dependency entry must belong to a declared transformer and
        // reference only declared transformers.
        for (stage, dependencies) in declared {
            if !names.contains(stage.as_str()) {
                errors.push(BuildError::UnknownDependent {
                    stage: stage.clone(),
                });
                continue;
            }
            for reference in dependencies {
                if !names.contains(reference.as_str()) {
                    errors.push(BuildError::UnknownDependency {
                        stage: stage.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        // Normalized edges: every node present, references restricted to
        // declared names so cycle detection still runs on partially bad input.
        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in &names {
            let edges = declared
                .get(*name)
                .map(|deps| {
                    deps.iter()
                        .filter(|dep| names.contains(dep.as_str()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            dependencies.insert((*name).to_string(), edges);
        }

        errors.extend(detect_cycle(&dependencies));
        if !errors.is_empty() {
            return Err(errors);
        }

        let referenced: BTreeSet<&str> = dependencies
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        let terminals: Vec<String> = names
            .iter()
            .copied()
            .filter(|name| !referenced.contains(*name))
            .map(str::to_string)
            .collect();

        Ok(Self {
            dependencies,
            terminals,
        })
    }

    /// Declared dependencies of a node, in declaration order
    pub(crate) fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Transformers no other transformer depends on, in name order
    pub(crate) fn terminals(&self) -> &[String] {
        &self.terminals
    }
}

/// Kahn's algorithm over the normalized edges; any node left with pending
/// dependencies sits on or downstream of a cycle
fn detect_cycle(dependencies: &BTreeMap<String, Vec<String>>) -> Option<BuildError> {
    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (stage, deps) in dependencies {
        pending.insert(stage.as_str(), deps.len());
        for dep in deps {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(stage.as_str());
        }
    }

    let mut ready: VecDeque<&str> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut completed = 0usize;
    while let Some(name) = ready.pop_front() {
        completed += 1;
        for dependent in dependents.get(name).into_iter().flatten().copied() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    if completed == dependencies.len() {
        return None;
    }

    let stuck: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(name, _)| *name)
        .collect();
    Some(BuildError::DependencyCycle {
        cycle: trace_cycle(&stuck, dependencies),
    })
}

/// Walk stuck dependencies from the first stuck node until a node repeats,
/// then print the loop it closed
fn trace_cycle(stuck: &BTreeSet<&str>, dependencies: &BTreeMap<String, Vec<String>>) -> String {
    let Some(start) = stuck.iter().next().copied() else {
        return String::new();
    };

    let mut path: Vec<&str> = Vec::new();
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
    let mut current = start;
    loop {
        if let Some(&first) = positions.get(current) {
            let mut cycle = path[first..].to_vec();
            cycle.push(current);
            return cycle.join(" -> ");
        }
        positions.insert(current, path.len());
        path.push(current);

        let next = dependencies
            .get(current)
            .and_then(|deps| deps.iter().find(|dep| stuck.contains(dep.as_str())));
        match next {
            Some(next) => current = next.as_str(),
            // Every stuck node keeps a stuck dependency; guard anyway.
            None => return path.join(" -> "),
        }
    }
}
