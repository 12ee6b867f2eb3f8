//! Teardown executor.
//!
//! Decommissions what an activation run left behind, consumers first. A
//! component whose destroy fails keeps every producer it depends on alive,
//! the same way a failed activation blocks its consumers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_common::config::StrataConfig;
use strata_common::error::{Result, StrataError};
use strata_common::types::ComponentId;
use strata_graph::graph::Graph;
use strata_graph::teardown;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::backend::{DestroyRequest, ProvisioningBackend};
use crate::cancel::CancelSignal;
use crate::report::ActivationReport;

/// Final teardown outcome of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TeardownOutcome {
    /// The backend destroyed it.
    Destroyed,
    /// The backend failed to destroy it.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
    /// Kept because a consumer could not be destroyed.
    Retained {
        /// The consumer whose destroy failed.
        by: ComponentId,
    },
    /// Never attempted because the teardown was cancelled.
    Cancelled,
}

impl fmt::Display for TeardownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroyed => f.write_str("destroyed"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Retained { by } => write!(f, "retained for {by}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of one teardown run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Unique id of the teardown.
    pub run_id: Uuid,
    /// When the first batch started.
    pub started_at: DateTime<Utc>,
    /// When the last batch settled.
    pub finished_at: DateTime<Utc>,
    /// Outcome per component that was live when teardown began.
    pub outcomes: BTreeMap<ComponentId, TeardownOutcome>,
}

impl TeardownReport {
    /// Returns the outcome recorded for `id`.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&TeardownOutcome> {
        self.outcomes.get(id)
    }

    /// Destroyed components, ascending.
    #[must_use]
    pub fn destroyed(&self) -> Vec<ComponentId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == TeardownOutcome::Destroyed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns whether everything live was destroyed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| *o == TeardownOutcome::Destroyed)
    }
}

/// Drives teardown against a provisioning backend.
pub struct TeardownExecutor {
    backend: Arc<dyn ProvisioningBackend>,
    config: StrataConfig,
}

impl TeardownExecutor {
    /// Creates an executor over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ProvisioningBackend>, config: StrataConfig) -> Self {
        Self { backend, config }
    }

    /// Destroys every component `report` marks activated, in reverse
    /// dependency order, passing each one the outputs it published.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UndeclaredLive`] without touching the backend
    /// if `report` has live components `graph` does not declare, or
    /// [`StrataError::CyclicDependency`] if the graph cannot be ordered.
    /// Backend failures are recorded in the report.
    pub async fn run(
        &self,
        graph: &Graph,
        report: &ActivationReport,
        cancel: &CancelSignal,
    ) -> Result<TeardownReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let live = report.live();
        let undeclared: Vec<ComponentId> = live
            .iter()
            .filter(|id| graph.component(id.as_str()).is_err())
            .cloned()
            .collect();
        if !undeclared.is_empty() {
            return Err(StrataError::UndeclaredLive { ids: undeclared });
        }
        let batches = teardown::plan(graph, &live)?;
        let permits = Arc::new(Semaphore::new(
            self.config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut outcomes: BTreeMap<ComponentId, TeardownOutcome> = BTreeMap::new();

        tracing::info!(run = %run_id, batches = batches.len(), "teardown started");

        for (index, batch) in batches.iter().enumerate() {
            if cancel.is_raised() {
                for id in batches.iter().skip(index).flatten() {
                    let _ = outcomes.insert(id.clone(), TeardownOutcome::Cancelled);
                }
                tracing::warn!(run = %run_id, batch = index, "teardown cancelled");
                break;
            }
            tracing::info!(batch = index, size = batch.len(), "tearing down batch");

            let mut tasks = JoinSet::new();
            for id in batch {
                if let Some(by) = retaining_consumer(graph, id, &outcomes) {
                    tracing::warn!(component = %id, retained_for = %by, "component retained");
                    let _ = outcomes.insert(id.clone(), TeardownOutcome::Retained { by });
                    continue;
                }
                let kind = match graph.component(id.as_str()) {
                    Ok(component) => component.kind,
                    Err(err) => {
                        let _ = outcomes.insert(
                            id.clone(),
                            TeardownOutcome::Failed {
                                reason: err.to_string(),
                            },
                        );
                        continue;
                    }
                };
                let request = DestroyRequest {
                    id: id.clone(),
                    kind,
                    outputs: report.outputs_of(id.as_str()).cloned().unwrap_or_default(),
                };
                let backend = Arc::clone(&self.backend);
                let permits = Arc::clone(&permits);
                let _ = tasks.spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let outcome = match backend.destroy(&request).await {
                        Ok(()) => {
                            tracing::info!(component = %request.id, "component destroyed");
                            TeardownOutcome::Destroyed
                        }
                        Err(err) => {
                            tracing::warn!(component = %request.id, error = %err, "destroy failed");
                            TeardownOutcome::Failed {
                                reason: err.to_string(),
                            }
                        }
                    };
                    (request.id, outcome)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((id, outcome)) => {
                        let _ = outcomes.insert(id, outcome);
                    }
                    Err(err) => tracing::error!(error = %err, "teardown task aborted"),
                }
            }
            for id in batch {
                if !outcomes.contains_key(id) {
                    let _ = outcomes.insert(
                        id.clone(),
                        TeardownOutcome::Failed {
                            reason: "teardown task panicked".into(),
                        },
                    );
                }
            }
        }

        tracing::info!(run = %run_id, components = outcomes.len(), "teardown finished");
        Ok(TeardownReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        })
    }
}

/// Returns the consumer whose failed destroy keeps `id` alive, if any.
///
/// Consumers are always handled in earlier batches. Consumers that were
/// never live have no outcome and do not retain anything.
fn retaining_consumer(
    graph: &Graph,
    id: &ComponentId,
    outcomes: &BTreeMap<ComponentId, TeardownOutcome>,
) -> Option<ComponentId> {
    graph
        .consumers_of(id.as_str())
        .into_iter()
        .filter_map(|consumer| match outcomes.get(&consumer) {
            Some(TeardownOutcome::Failed { .. }) => Some(consumer),
            Some(TeardownOutcome::Retained { by }) => Some(by.clone()),
            _ => None,
        })
        .min()
}
