//! # strata-graph
//!
//! Everything needed to turn a set of declared components into an
//! ordered, wired activation plan:
//! - **Registry**: declared components, their input slots and output schemas.
//! - **Reference**: typed output references, checked at bind time and
//!   resolved against a run's ledger.
//! - **Graph**: the dependency DAG derived from bindings and explicit edges.
//! - **Scheduler**: Kahn batching with deterministic ordering.
//! - **Teardown**: the same batching over reversed edges.
//! - **Ledger**: per-run write-once activation state and published outputs.
//! - **Declaration**: YAML topology documents replayed into a registry.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod declaration;
pub mod graph;
pub mod ledger;
pub mod reference;
pub mod registry;
pub mod scheduler;
pub mod teardown;
