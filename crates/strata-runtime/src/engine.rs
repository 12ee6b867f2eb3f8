//! Activation engine.
//!
//! Walks scheduler batches in order. Every component of a batch is
//! activated on its own task, bounded by a semaphore, and the next batch
//! only starts once every task of the current one has settled. A failed
//! component blocks everything downstream of it; unrelated components carry
//! on.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use strata_common::config::StrataConfig;
use strata_common::error::Result;
use strata_common::types::ComponentId;
use strata_graph::graph::Graph;
use strata_graph::ledger::{ActivationState, Ledger};
use strata_graph::reference;
use strata_graph::registry::Component;
use strata_graph::scheduler::{self, Batch};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::backend::{self, BackendError, CreateRequest, ProvisioningBackend};
use crate::cancel::CancelSignal;
use crate::report::{ActivationReport, Outcome};

/// Drives a graph's activation against a provisioning backend.
pub struct ActivationEngine {
    backend: Arc<dyn ProvisioningBackend>,
    config: StrataConfig,
}

impl ActivationEngine {
    /// Creates an engine over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ProvisioningBackend>, config: StrataConfig) -> Self {
        Self { backend, config }
    }

    /// Schedules `graph` and activates it.
    ///
    /// # Errors
    ///
    /// Returns [`strata_common::error::StrataError::CyclicDependency`] if the
    /// graph cannot be ordered. Backend failures never surface here; they
    /// are recorded in the report.
    pub async fn activate(&self, graph: &Graph, cancel: &CancelSignal) -> Result<ActivationReport> {
        let batches = scheduler::order(graph)?;
        Ok(self.run(graph, &batches, cancel).await)
    }

    /// Activates `graph` batch by batch.
    ///
    /// `batches` must come from [`scheduler::order`] on the same graph.
    /// Each component is attempted at most once. Once `cancel` is raised no
    /// further batch starts and every component not yet dispatched is
    /// reported `Cancelled`.
    pub async fn run(
        &self,
        graph: &Graph,
        batches: &[Batch],
        cancel: &CancelSignal,
    ) -> ActivationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let ledger = Arc::new(Ledger::for_graph(graph));
        let permits = Arc::new(Semaphore::new(
            self.config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut outcomes: BTreeMap<ComponentId, Outcome> = BTreeMap::new();

        tracing::info!(
            run = %run_id,
            components = graph.len(),
            batches = batches.len(),
            "activation started"
        );

        for (index, batch) in batches.iter().enumerate() {
            if cancel.is_raised() {
                for id in batches.iter().skip(index).flatten() {
                    settle(&ledger, id, ActivationState::Cancelled);
                    let _ = outcomes.insert(id.clone(), Outcome::Cancelled);
                }
                tracing::warn!(run = %run_id, batch = index, "activation cancelled");
                break;
            }
            tracing::info!(batch = index, size = batch.len(), "activating batch");

            let mut tasks = JoinSet::new();
            for id in batch {
                if let Some(root) = blocking_root(graph, id, &outcomes) {
                    tracing::warn!(component = %id, blocked_by = %root, "component blocked");
                    settle(&ledger, id, ActivationState::Blocked);
                    let _ = outcomes.insert(id.clone(), Outcome::Blocked { by: root });
                    continue;
                }
                let component = match graph.component(id.as_str()) {
                    Ok(component) => component.clone(),
                    Err(err) => {
                        let _ = outcomes.insert(
                            id.clone(),
                            Outcome::Failed {
                                reason: err.to_string(),
                            },
                        );
                        continue;
                    }
                };
                settle(&ledger, id, ActivationState::Ready);
                let _ = tasks.spawn(activate(
                    component,
                    Arc::clone(&ledger),
                    Arc::clone(&self.backend),
                    Arc::clone(&permits),
                    self.config.strict_outputs,
                ));
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((id, outcome)) => {
                        let _ = outcomes.insert(id, outcome);
                    }
                    Err(err) => tracing::error!(error = %err, "activation task aborted"),
                }
            }
            for id in batch {
                if !outcomes.contains_key(id) {
                    settle(&ledger, id, ActivationState::Failed);
                    let _ = outcomes.insert(
                        id.clone(),
                        Outcome::Failed {
                            reason: "activation task panicked".into(),
                        },
                    );
                }
            }
        }

        let outputs = ledger
            .ids_in(ActivationState::Activated)
            .into_iter()
            .filter_map(|id| {
                let published = ledger.outputs(&id)?.clone();
                Some((id, published))
            })
            .collect();
        let report = ActivationReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            outputs,
        };
        tracing::info!(run = %run_id, summary = %report.summary(), "activation finished");
        report
    }
}

/// Returns the failed component responsible for blocking `id`, if any.
///
/// Producers settle in earlier batches, so their outcomes are final. When
/// several failures reach `id`, the smallest id is reported.
fn blocking_root(
    graph: &Graph,
    id: &ComponentId,
    outcomes: &BTreeMap<ComponentId, Outcome>,
) -> Option<ComponentId> {
    graph
        .producers_of(id.as_str())
        .into_iter()
        .filter_map(|producer| match outcomes.get(&producer) {
            Some(Outcome::Failed { .. }) => Some(producer),
            Some(Outcome::Blocked { by }) => Some(by.clone()),
            _ => None,
        })
        .min()
}

/// Moves `id` to `to`, logging if the lifecycle refuses.
fn settle(ledger: &Ledger, id: &ComponentId, to: ActivationState) {
    if let Err(err) = ledger.advance(id, to) {
        tracing::error!(component = %id, error = %err, "ledger transition refused");
    }
}

async fn activate(
    component: Component,
    ledger: Arc<Ledger>,
    backend: Arc<dyn ProvisioningBackend>,
    permits: Arc<Semaphore>,
    strict: bool,
) -> (ComponentId, Outcome) {
    let _permit = permits.acquire_owned().await;
    let outcome = match provision(&component, &ledger, backend.as_ref(), strict).await {
        Ok(()) => {
            tracing::info!(
                component = %component.id,
                kind = %component.kind,
                "component activated"
            );
            Outcome::Activated
        }
        Err(err) => {
            tracing::warn!(component = %component.id, error = %err, "component failed");
            settle(&ledger, &component.id, ActivationState::Failed);
            Outcome::Failed {
                reason: err.to_string(),
            }
        }
    };
    (component.id, outcome)
}

async fn provision(
    component: &Component,
    ledger: &Ledger,
    backend: &dyn ProvisioningBackend,
    strict: bool,
) -> std::result::Result<(), BackendError> {
    ledger.advance(&component.id, ActivationState::Activating)?;

    let mut inputs = BTreeMap::new();
    for (slot, binding) in component.bindings() {
        let _ = inputs.insert(slot.to_owned(), reference::resolve(binding, ledger)?);
    }
    let request = CreateRequest {
        id: component.id.clone(),
        kind: component.kind,
        inputs,
        schema: component.outputs.clone(),
    };
    tracing::debug!(
        component = %request.id,
        inputs = request.inputs.len(),
        "calling backend create"
    );

    let outputs = backend.create(&request).await?;
    let outputs = backend::conform(&component.id, &component.outputs, outputs, strict)?;
    ledger.publish(&component.id, outputs)?;
    Ok(())
}
