//! Dependency graph construction using `petgraph`.
//!
//! Derives a directed acyclic graph from a [`Registry`]: one `data` edge
//! per bound input and one `explicit` edge per declared dependency, both
//! pointing from producer to consumer so that producers sort first.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};
use strata_common::types::ComponentId;

use crate::registry::{Component, Registry};

/// Why one component must come after another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeReason {
    /// Declared ordering with no data flow.
    Explicit,
    /// The consumer reads one of the producer's outputs.
    Data,
}

impl fmt::Display for EdgeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// A dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    /// Component that must be activated first.
    pub producer: ComponentId,
    /// Component that depends on it.
    pub consumer: ComponentId,
    /// Kind of dependency. A pair linked both ways is recorded as `Data`.
    pub reason: EdgeReason,
}

/// A validated, acyclic dependency graph of components.
///
/// Only [`build`] produces one, so holding a `Graph` proves the edge set
/// is acyclic and every input is bound.
#[derive(Debug)]
pub struct Graph {
    registry: Registry,
    dag: DiGraph<ComponentId, EdgeReason>,
    nodes: BTreeMap<ComponentId, NodeIndex>,
}

/// Builds the dependency graph for every registered component.
///
/// # Errors
///
/// Returns [`StrataError::UnboundInput`] if any declared input is unbound,
/// or [`StrataError::CyclicDependency`] carrying the full cycle (a
/// self-dependency is reported as `[a, a]`).
pub fn build(registry: Registry) -> Result<Graph> {
    registry.check_complete()?;

    let mut dag = DiGraph::new();
    let mut nodes = BTreeMap::new();
    for component in registry.components() {
        let idx = dag.add_node(component.id.clone());
        let _ = nodes.insert(component.id.clone(), idx);
    }

    let mut graph = Graph {
        registry: Registry::new(),
        dag,
        nodes,
    };
    for component in registry.components() {
        for (_, reference) in component.bindings() {
            graph.add_edge(&reference.producer, &component.id, EdgeReason::Data)?;
        }
        for producer in &component.depends_on {
            graph.add_edge(producer, &component.id, EdgeReason::Explicit)?;
        }
    }
    graph.registry = registry;

    if let Some(cycle) = graph.find_cycle() {
        return Err(StrataError::CyclicDependency { cycle });
    }
    tracing::info!(
        components = graph.len(),
        edges = graph.dag.edge_count(),
        "dependency graph built"
    );
    Ok(graph)
}

impl Graph {
    /// Returns the registry the graph was built from.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Looks up a component.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] if absent.
    pub fn component(&self, id: &str) -> Result<&Component> {
        self.registry.get(id)
    }

    /// Iterates over component ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.nodes.keys()
    }

    /// Returns every edge, sorted by producer then consumer.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .dag
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.dag.edge_endpoints(e)?;
                Some(Edge {
                    producer: self.dag[from].clone(),
                    consumer: self.dag[to].clone(),
                    reason: self.dag[e],
                })
            })
            .collect();
        edges.sort();
        edges
    }

    /// Returns the components `id` directly depends on, ascending.
    #[must_use]
    pub fn producers_of(&self, id: &str) -> Vec<ComponentId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Returns the components directly depending on `id`, ascending.
    #[must_use]
    pub fn consumers_of(&self, id: &str) -> Vec<ComponentId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of `direction` neighbours of `id`, counting each once.
    pub(crate) fn degree(&self, id: &str, direction: Direction) -> usize {
        self.neighbors(id, direction).len()
    }

    pub(crate) fn neighbors(&self, id: &str, direction: Direction) -> Vec<ComponentId> {
        let Some(&idx) = self.nodes.get(id) else {
            return Vec::new();
        };
        self.sorted_neighbors(idx, direction)
            .into_iter()
            .map(|n| self.dag[n].clone())
            .collect()
    }

    fn add_edge(
        &mut self,
        producer: &ComponentId,
        consumer: &ComponentId,
        reason: EdgeReason,
    ) -> Result<()> {
        let from = self.index(producer)?;
        let to = self.index(consumer)?;
        match self.dag.find_edge(from, to) {
            Some(existing) => {
                if reason == EdgeReason::Data {
                    self.dag[existing] = EdgeReason::Data;
                }
            }
            None => {
                let _ = self.dag.add_edge(from, to, reason);
            }
        }
        Ok(())
    }

    fn index(&self, id: &ComponentId) -> Result<NodeIndex> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| StrataError::UnknownComponent { id: id.clone() })
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.dag.neighbors_directed(idx, direction).collect();
        neighbors.sort_by(|a, b| self.dag[*a].cmp(&self.dag[*b]));
        neighbors.dedup();
        neighbors
    }

    /// Depth-first search tracking the in-progress path. Returns the first
    /// cycle found as a closed walk, visiting roots and successors in
    /// ascending id order so the reported cycle is deterministic.
    pub(crate) fn find_cycle(&self) -> Option<Vec<ComponentId>> {
        let mut marks = HashMap::new();
        for &root in self.nodes.values() {
            if !marks.contains_key(&root) {
                if let Some(cycle) = self.walk(root, &mut marks) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Explores everything reachable from `root`. The frame stack is the
    /// in-progress path, so chain depth is bounded by memory, not by the
    /// thread stack.
    fn walk(
        &self,
        root: NodeIndex,
        marks: &mut HashMap<NodeIndex, Mark>,
    ) -> Option<Vec<ComponentId>> {
        let _ = marks.insert(root, Mark::InProgress);
        let mut path = vec![Frame::new(self, root)];
        while let Some(frame) = path.last_mut() {
            let node = frame.node;
            let Some(next) = frame.advance() else {
                let _ = marks.insert(node, Mark::Done);
                let _ = path.pop();
                continue;
            };
            match marks.get(&next) {
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|f| f.node == next)?;
                    let mut cycle: Vec<ComponentId> =
                        path[start..].iter().map(|f| self.dag[f.node].clone()).collect();
                    cycle.push(self.dag[next].clone());
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    let _ = marks.insert(next, Mark::InProgress);
                    path.push(Frame::new(self, next));
                }
            }
        }
        None
    }
}

/// One node on the depth-first path and the successors still to visit.
struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    cursor: usize,
}

impl Frame {
    fn new(graph: &Graph, node: NodeIndex) -> Self {
        Self {
            node,
            successors: graph.sorted_neighbors(node, Direction::Outgoing),
            cursor: 0,
        }
    }

    fn advance(&mut self) -> Option<NodeIndex> {
        let next = self.successors.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}
