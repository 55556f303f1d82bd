// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::resolve::resolve_order;
use crate::errors::{Result, StagedagError};
use crate::types::StageId;

/// One graph vertex: its upstream stage ids and the body to run.
#[derive(Debug, Clone)]
pub struct Node<R> {
    /// Direct dependencies, in declared order. The order matters: it is the
    /// tie-break between unrelated branches (see [`DependencyGraph::resolve`]).
    pub dependencies: Vec<StageId>,
    pub runnable: R,
}

/// Mapping from stage id to its [`Node`].
///
/// A `DependencyGraph` can only be obtained from [`DependencyGraphBuilder::build`],
/// which guarantees that every referenced dependency exists and that the
/// graph is acyclic.
#[derive(Debug)]
pub struct DependencyGraph<R> {
    nodes: HashMap<StageId, Node<R>>,
    /// Insertion order, kept for listing and diagnostics.
    ids: Vec<StageId>,
}

impl<R> DependencyGraph<R> {
    pub fn builder() -> DependencyGraphBuilder<R> {
        DependencyGraphBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All stage ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|s| s.as_str())
    }

    /// Immediate dependencies of a stage, in declared order.
    pub fn dependencies_of(&self, id: &str) -> &[StageId] {
        self.nodes
            .get(id)
            .map(|n| n.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn node(&self, id: &str) -> Option<&Node<R>> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node<R>> {
        self.nodes.get_mut(id)
    }

    /// Execution order needed to satisfy `target`.
    ///
    /// Only `target` and its transitive dependencies are included, and every
    /// stage comes after everything it depends on. Unrelated siblings are
    /// ordered deterministically with the **last-declared dependency first**:
    /// for `t` depending on `[x, y]` the order is `[y, x, t]`.
    pub fn resolve(&self, target: &str) -> Result<Vec<StageId>> {
        if !self.nodes.contains_key(target) {
            return Err(StagedagError::StageNotFound(target.to_string()));
        }
        Ok(resolve_order(target, |id| self.dependencies_of(id)))
    }
}

/// Collects nodes and validates them into a [`DependencyGraph`].
#[derive(Debug)]
pub struct DependencyGraphBuilder<R> {
    nodes: BTreeMap<StageId, Node<R>>,
    ids: Vec<StageId>,
    duplicates: Vec<StageId>,
}

impl<R> Default for DependencyGraphBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DependencyGraphBuilder<R> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            ids: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    /// Add a node. Duplicate dependency ids are dropped (first occurrence wins);
    /// a duplicate node id is reported by [`build`](Self::build).
    pub fn add_node<I, S>(&mut self, id: impl Into<StageId>, dependencies: I, runnable: R) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StageId>,
    {
        let id = id.into();
        let mut seen = HashSet::new();
        let dependencies: Vec<StageId> = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|d| seen.insert(d.clone()))
            .collect();

        if self.nodes.contains_key(&id) {
            self.duplicates.push(id);
            return self;
        }

        self.ids.push(id.clone());
        self.nodes.insert(
            id,
            Node {
                dependencies,
                runnable,
            },
        );
        self
    }

    pub fn node<I, S>(mut self, id: impl Into<StageId>, dependencies: I, runnable: R) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StageId>,
    {
        self.add_node(id, dependencies, runnable);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Validate and freeze the graph.
    ///
    /// Fails with `ConfigError` on duplicate ids, unknown dependencies and
    /// self-dependencies, and with `DependencyCycle` if the graph has a cycle.
    pub fn build(self) -> Result<DependencyGraph<R>> {
        if let Some(dup) = self.duplicates.first() {
            return Err(StagedagError::ConfigError(format!(
                "stage '{}' is defined more than once",
                dup
            )));
        }

        for id in &self.ids {
            let node = &self.nodes[id];
            for dep in &node.dependencies {
                if dep == id {
                    return Err(StagedagError::ConfigError(format!(
                        "stage '{}' cannot depend on itself",
                        id
                    )));
                }
                if !self.nodes.contains_key(dep) {
                    return Err(StagedagError::ConfigError(format!(
                        "stage '{}' has unknown dependency '{}'",
                        id, dep
                    )));
                }
            }
        }

        ensure_acyclic(&self.ids, |id| self.nodes[id].dependencies.as_slice())?;

        Ok(DependencyGraph {
            nodes: self.nodes.into_iter().collect(),
            ids: self.ids,
        })
    }
}

/// Fail with `DependencyCycle` if the `id -> dependencies` relation has a cycle.
///
/// Edge direction: dep -> stage.
pub(crate) fn ensure_acyclic<'a, F>(ids: &'a [StageId], deps_of: F) -> Result<()>
where
    F: Fn(&'a str) -> &'a [StageId],
{
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in ids {
        graph.add_node(id.as_str());
    }
    for id in ids {
        for dep in deps_of(id.as_str()) {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(StagedagError::DependencyCycle(format!(
            "cycle detected in stage graph involving stage '{}'",
            cycle.node_id()
        ))),
    }
}
