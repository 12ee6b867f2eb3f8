//! Topological scheduling into concurrent batches.
//!
//! Kahn's algorithm, peeling off every zero in-degree component at once:
//! each peel is one batch of mutually independent components, and every
//! batch fully precedes the next. Only the components released by the
//! previous batch are examined for the next one.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use strata_common::error::{Result, StrataError};
use strata_common::types::ComponentId;

use crate::graph::Graph;

/// Components that can be processed concurrently, in ascending id order.
pub type Batch = Vec<ComponentId>;

/// Returns the activation batches: producers always land in an earlier
/// batch than their consumers.
///
/// # Errors
///
/// Returns [`StrataError::CyclicDependency`] if components remain but none
/// is free of dependencies.
pub fn order(graph: &Graph) -> Result<Vec<Batch>> {
    let batches = batches(graph, Direction::Incoming)?;
    tracing::debug!(batches = batches.len(), "activation order resolved");
    Ok(batches)
}

/// Batches `graph`, where `waits_on` is the edge direction pointing at the
/// components a node must wait for (`Incoming` for activation, `Outgoing`
/// for teardown).
pub(crate) fn batches(graph: &Graph, waits_on: Direction) -> Result<Vec<Batch>> {
    let mut pending: HashMap<ComponentId, usize> = graph
        .ids()
        .map(|id| (id.clone(), graph.degree(id.as_str(), waits_on)))
        .collect();
    let releases = waits_on.opposite();

    let mut frontier: Batch = graph
        .ids()
        .filter(|id| pending.get(*id) == Some(&0))
        .cloned()
        .collect();
    let mut placed = 0;
    let mut batches = Vec::new();
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in &frontier {
            for consumer in graph.neighbors(id.as_str(), releases) {
                if let Some(count) = pending.get_mut(&consumer) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        next.push(consumer);
                    }
                }
            }
        }
        next.sort();
        placed += frontier.len();
        batches.push(std::mem::replace(&mut frontier, next));
    }

    if placed < graph.len() {
        let cycle = graph.find_cycle().unwrap_or_else(|| {
            pending
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(id, _)| id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        });
        return Err(StrataError::CyclicDependency { cycle });
    }
    Ok(batches)
}
