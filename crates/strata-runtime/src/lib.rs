//! Activation and teardown of a strata graph against a provisioning
//! backend.
//!
//! The [`engine::ActivationEngine`] walks scheduler batches, activating
//! each batch concurrently behind a barrier; the
//! [`teardown::TeardownExecutor`] walks the reversed plan. Both fold
//! per-component backend failures into a report instead of aborting.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod cancel;
pub mod engine;
pub mod report;
pub mod state;
pub mod teardown;
