//! Outcome of an activation run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_common::types::{ComponentId, Outputs};
use uuid::Uuid;

/// Final per-run outcome of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// Created and outputs published.
    Activated,
    /// The backend (or input resolution) failed.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
    /// Never attempted because a producer it depends on failed.
    Blocked {
        /// The failed component at the root of the chain.
        by: ComponentId,
    },
    /// Never attempted because the run was cancelled.
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => f.write_str("activated"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Blocked { by } => write!(f, "blocked by {by}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of one activation run: an outcome for every component plus the
/// outputs every activated component published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// When the first batch started.
    pub started_at: DateTime<Utc>,
    /// When the last batch settled.
    pub finished_at: DateTime<Utc>,
    /// Outcome per component.
    pub outcomes: BTreeMap<ComponentId, Outcome>,
    /// Published outputs of activated components.
    pub outputs: BTreeMap<ComponentId, Outputs>,
}

/// Outcome counts of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Components activated.
    pub activated: usize,
    /// Components whose activation failed.
    pub failed: usize,
    /// Components blocked by a failure.
    pub blocked: usize,
    /// Components never started because of cancellation.
    pub cancelled: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} activated, {} failed, {} blocked, {} cancelled",
            self.activated, self.failed, self.blocked, self.cancelled
        )
    }
}

impl ActivationReport {
    /// Returns the outcome recorded for `id`.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.get(id)
    }

    /// Returns the outputs `id` published, if it was activated.
    #[must_use]
    pub fn outputs_of(&self, id: &str) -> Option<&Outputs> {
        self.outputs.get(id)
    }

    /// Activated components, ascending.
    #[must_use]
    pub fn activated(&self) -> Vec<ComponentId> {
        self.ids_where(|o| matches!(o, Outcome::Activated))
    }

    /// Failed components, ascending.
    #[must_use]
    pub fn failed(&self) -> Vec<ComponentId> {
        self.ids_where(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Blocked components, ascending.
    #[must_use]
    pub fn blocked(&self) -> Vec<ComponentId> {
        self.ids_where(|o| matches!(o, Outcome::Blocked { .. }))
    }

    /// Cancelled components, ascending.
    #[must_use]
    pub fn cancelled(&self) -> Vec<ComponentId> {
        self.ids_where(|o| matches!(o, Outcome::Cancelled))
    }

    /// Components that exist after the run and would need decommissioning.
    #[must_use]
    pub fn live(&self) -> BTreeSet<ComponentId> {
        self.activated().into_iter().collect()
    }

    /// Returns whether every component was activated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(|o| *o == Outcome::Activated)
    }

    /// Counts outcomes by kind.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.outcomes
            .values()
            .fold(Summary::default(), |mut summary, outcome| {
                match outcome {
                    Outcome::Activated => summary.activated += 1,
                    Outcome::Failed { .. } => summary.failed += 1,
                    Outcome::Blocked { .. } => summary.blocked += 1,
                    Outcome::Cancelled => summary.cancelled += 1,
                }
                summary
            })
    }

    /// Drops every trace of `ids`, typically after they were destroyed.
    pub fn forget<'a>(&mut self, ids: impl IntoIterator<Item = &'a ComponentId>) {
        for id in ids {
            let _ = self.outcomes.remove(id);
            let _ = self.outputs.remove(id);
        }
    }

    fn ids_where(&self, pred: impl Fn(&Outcome) -> bool) -> Vec<ComponentId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
