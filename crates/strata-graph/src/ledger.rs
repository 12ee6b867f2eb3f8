//! Per-run activation ledger.
//!
//! Holds one cell per component: its current [`ActivationState`] and the
//! outputs it published. Each cell is written only by the task activating
//! that component; publication is write-once, so readers never need a lock.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use strata_common::error::{Result, StrataError};
use strata_common::types::{ComponentId, Outputs};

pub use strata_common::types::ActivationState;

use crate::graph::Graph;

const STATES: [ActivationState; 7] = [
    ActivationState::Pending,
    ActivationState::Ready,
    ActivationState::Activating,
    ActivationState::Activated,
    ActivationState::Failed,
    ActivationState::Blocked,
    ActivationState::Cancelled,
];

#[derive(Debug)]
struct Cell {
    state: AtomicU8,
    outputs: OnceLock<Outputs>,
}

impl Cell {
    fn load(&self) -> ActivationState {
        let raw = self.state.load(Ordering::Acquire);
        STATES
            .get(usize::from(raw))
            .copied()
            .unwrap_or(ActivationState::Pending)
    }
}

/// Activation state and published outputs of every component in one run.
#[derive(Debug)]
pub struct Ledger {
    cells: BTreeMap<ComponentId, Cell>,
}

impl Ledger {
    /// Creates a ledger with every given component `Pending`.
    pub fn new(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        let cells = ids
            .into_iter()
            .map(|id| {
                let cell = Cell {
                    state: AtomicU8::new(ActivationState::Pending as u8),
                    outputs: OnceLock::new(),
                };
                (id, cell)
            })
            .collect();
        Self { cells }
    }

    /// Creates a ledger tracking every component of `graph`.
    #[must_use]
    pub fn for_graph(graph: &Graph) -> Self {
        Self::new(graph.ids().cloned())
    }

    /// Returns the current state of a component, if tracked.
    #[must_use]
    pub fn state(&self, id: &ComponentId) -> Option<ActivationState> {
        self.cells.get(id).map(Cell::load)
    }

    /// Moves a component to `to`.
    ///
    /// `Activated` can only be reached through [`Ledger::publish`].
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] if the component is not
    /// tracked, or [`StrataError::InvalidTransition`] if the lifecycle does
    /// not allow the move.
    pub fn advance(&self, id: &ComponentId, to: ActivationState) -> Result<()> {
        let cell = self.cell(id)?;
        let mut current = cell.load();
        loop {
            if to == ActivationState::Activated || !current.can_advance_to(to) {
                return Err(StrataError::InvalidTransition {
                    id: id.clone(),
                    from: current,
                    to,
                });
            }
            match cell.state.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    tracing::trace!(component = %id, from = %current, to = %to, "state advanced");
                    return Ok(());
                }
                Err(raw) => {
                    current = STATES
                        .get(usize::from(raw))
                        .copied()
                        .unwrap_or(ActivationState::Pending);
                }
            }
        }
    }

    /// Publishes a component's outputs and marks it `Activated`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::AlreadyPublished`] on a second publication
    /// (the first outputs are kept), or [`StrataError::InvalidTransition`]
    /// if the component is not `Activating`.
    pub fn publish(&self, id: &ComponentId, outputs: Outputs) -> Result<()> {
        let cell = self.cell(id)?;
        let current = cell.load();
        if cell.outputs.get().is_some() {
            return Err(StrataError::AlreadyPublished { id: id.clone() });
        }
        if current != ActivationState::Activating {
            return Err(StrataError::InvalidTransition {
                id: id.clone(),
                from: current,
                to: ActivationState::Activated,
            });
        }
        cell.outputs
            .set(outputs)
            .map_err(|_| StrataError::AlreadyPublished { id: id.clone() })?;
        cell.state
            .store(ActivationState::Activated as u8, Ordering::Release);
        Ok(())
    }

    /// Returns a component's published outputs once it is `Activated`.
    #[must_use]
    pub fn outputs(&self, id: &ComponentId) -> Option<&Outputs> {
        let cell = self.cells.get(id)?;
        if cell.load() == ActivationState::Activated {
            cell.outputs.get()
        } else {
            None
        }
    }

    /// Returns, in ascending order, every component currently in `state`.
    #[must_use]
    pub fn ids_in(&self, state: ActivationState) -> Vec<ComponentId> {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.load() == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of tracked components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether no component is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn cell(&self, id: &ComponentId) -> Result<&Cell> {
        self.cells
            .get(id)
            .ok_or_else(|| StrataError::UnknownComponent { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use strata_common::types::Value;

    use super::*;

    fn outputs(value: &str) -> Outputs {
        BTreeMap::from([("bucket_name".to_owned(), Value::String(value.into()))])
    }

    fn activating(id: &ComponentId) -> Ledger {
        let ledger = Ledger::new([id.clone()]);
        ledger.advance(id, ActivationState::Ready).expect("ready");
        ledger
            .advance(id, ActivationState::Activating)
            .expect("activating");
        ledger
    }

    #[test]
    fn new_components_start_pending() {
        let ledger = Ledger::new([ComponentId::new("a"), ComponentId::new("b")]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.state(&"a".into()), Some(ActivationState::Pending));
        assert_eq!(ledger.state(&"zzz".into()), None);
    }

    #[test]
    fn publish_flips_to_activated() {
        let id = ComponentId::new("bucket");
        let ledger = activating(&id);
        assert!(ledger.outputs(&id).is_none());
        ledger.publish(&id, outputs("logs")).expect("publish");
        assert_eq!(ledger.state(&id), Some(ActivationState::Activated));
        assert_eq!(ledger.outputs(&id), Some(&outputs("logs")));
    }

    #[test]
    fn second_publish_never_overwrites() {
        let id = ComponentId::new("bucket");
        let ledger = activating(&id);
        ledger.publish(&id, outputs("first")).expect("publish");
        let err = ledger.publish(&id, outputs("second")).unwrap_err();
        assert!(matches!(err, StrataError::AlreadyPublished { .. }));
        assert_eq!(ledger.outputs(&id), Some(&outputs("first")));
    }

    #[test]
    fn publish_requires_activating() {
        let id = ComponentId::new("bucket");
        let ledger = Ledger::new([id.clone()]);
        let err = ledger.publish(&id, outputs("x")).unwrap_err();
        assert!(matches!(
            err,
            StrataError::InvalidTransition {
                from: ActivationState::Pending,
                ..
            }
        ));
    }

    #[test]
    fn advance_rejects_skipping_and_leaving_terminal_states() {
        let id = ComponentId::new("svc");
        let ledger = Ledger::new([id.clone()]);
        assert!(ledger.advance(&id, ActivationState::Activated).is_err());
        assert!(ledger.advance(&id, ActivationState::Activating).is_err());
        ledger.advance(&id, ActivationState::Blocked).expect("blocked");
        assert!(ledger.advance(&id, ActivationState::Ready).is_err());
        assert_eq!(ledger.ids_in(ActivationState::Blocked), vec![id]);
    }

    #[test]
    fn advance_unknown_component_fails() {
        let ledger = Ledger::new(Vec::<ComponentId>::new());
        assert!(ledger.is_empty());
        let err = ledger
            .advance(&"ghost".into(), ActivationState::Ready)
            .unwrap_err();
        assert!(matches!(err, StrataError::UnknownComponent { .. }));
    }
}
