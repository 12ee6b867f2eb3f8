//! Teardown planning: the activation batching over reversed edges, so
//! consumers are always decommissioned before their producers.

use std::collections::BTreeSet;

use petgraph::Direction;
use strata_common::error::Result;
use strata_common::types::ComponentId;

use crate::graph::Graph;
use crate::scheduler::{self, Batch};

/// Returns teardown batches for every component in the graph.
///
/// # Errors
///
/// Returns [`strata_common::error::StrataError::CyclicDependency`] under the
/// same conditions as [`scheduler::order`].
pub fn reverse_order(graph: &Graph) -> Result<Vec<Batch>> {
    scheduler::batches(graph, Direction::Outgoing)
}

/// Returns teardown batches restricted to components that actually exist.
///
/// Components outside `live` (failed, blocked, cancelled or never activated)
/// are left out; batches that end up empty are dropped. Ordering still
/// follows the full graph, so transitive consumers precede producers even
/// when an intermediate component is absent.
///
/// # Errors
///
/// See [`reverse_order`].
pub fn plan(graph: &Graph, live: &BTreeSet<ComponentId>) -> Result<Vec<Batch>> {
    let batches: Vec<Batch> = reverse_order(graph)?
        .into_iter()
        .map(|batch| batch.into_iter().filter(|id| live.contains(id)).collect::<Batch>())
        .filter(|batch| !batch.is_empty())
        .collect();
    tracing::debug!(
        batches = batches.len(),
        components = live.len(),
        "teardown order resolved"
    );
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use strata_common::types::{ComponentKind, ValueType};

    use super::*;
    use crate::graph::build;
    use crate::registry::Registry;

    fn chain() -> Graph {
        let mut registry = Registry::new();
        for id in ["a", "b", "c"] {
            let _ = registry
                .register(
                    id,
                    ComponentKind::Network,
                    BTreeMap::new(),
                    BTreeMap::from([("id".to_owned(), ValueType::Id)]),
                )
                .expect("register");
        }
        registry.depends_on("b", "a").expect("b after a");
        registry.depends_on("c", "b").expect("c after b");
        build(registry).expect("build")
    }

    fn ids(batch: &[&str]) -> Batch {
        batch.iter().map(|&s| ComponentId::new(s)).collect()
    }

    #[test]
    fn teardown_reverses_a_linear_chain() {
        let g = chain();
        assert_eq!(
            scheduler::order(&g).expect("order"),
            vec![ids(&["a"]), ids(&["b"]), ids(&["c"])]
        );
        assert_eq!(
            reverse_order(&g).expect("reverse"),
            vec![ids(&["c"]), ids(&["b"]), ids(&["a"])]
        );
    }

    #[test]
    fn plan_skips_components_that_do_not_exist() {
        let g = chain();
        let live: BTreeSet<ComponentId> =
            [ComponentId::new("a"), ComponentId::new("c")].into_iter().collect();
        assert_eq!(
            plan(&g, &live).expect("plan"),
            vec![ids(&["c"]), ids(&["a"])]
        );
    }

    #[test]
    fn plan_keeps_transitive_order_across_missing_components() {
        let mut registry = Registry::new();
        for id in ["bucket", "role", "svc", "dns"] {
            let _ = registry
                .register(id, ComponentKind::Storage, BTreeMap::new(), BTreeMap::new())
                .expect("register");
        }
        registry.depends_on("role", "bucket").expect("role after bucket");
        registry.depends_on("svc", "role").expect("svc after role");
        let g = build(registry).expect("build");
        let live: BTreeSet<ComponentId> =
            ["bucket", "svc", "dns"].into_iter().map(ComponentId::new).collect();
        assert_eq!(
            plan(&g, &live).expect("plan"),
            vec![ids(&["dns", "svc"]), ids(&["bucket"])]
        );
    }

    #[test]
    fn plan_with_nothing_live_is_empty() {
        let g = chain();
        assert!(plan(&g, &BTreeSet::new()).expect("plan").is_empty());
    }
}
