//! Unified error types for the strata workspace.
//!
//! Every variant except [`StrataError::NotYetActivated`] and
//! [`StrataError::UndeclaredLive`] is raised while a topology is being
//! declared or built, before any backend is touched.
//! Per-component runtime failures live in `strata-runtime` and are folded
//! into the activation report instead of surfacing here.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ActivationState, ComponentId, ValueType};

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// A component id was registered twice.
    #[error("component already registered: {id}")]
    DuplicateComponent {
        /// The id that was already taken.
        id: ComponentId,
    },

    /// A component id is not present in the registry.
    #[error("unknown component: {id}")]
    UnknownComponent {
        /// The id that was looked up.
        id: ComponentId,
    },

    /// A producer never declared the requested output.
    #[error("component {producer} does not declare output \"{output}\"")]
    UnknownOutput {
        /// Component expected to publish the output.
        producer: ComponentId,
        /// Output name that was requested.
        output: String,
    },

    /// A consumer never declared the input slot being bound.
    #[error("component {consumer} does not declare input \"{slot}\"")]
    UnknownInput {
        /// Component the binding targets.
        consumer: ComponentId,
        /// Slot name that was requested.
        slot: String,
    },

    /// An input slot was bound more than once.
    #[error("input \"{slot}\" of component {consumer} is already bound")]
    InputAlreadyBound {
        /// Component owning the slot.
        consumer: ComponentId,
        /// Slot name.
        slot: String,
    },

    /// A declared input slot was never bound to a producer.
    #[error("input \"{slot}\" of component {consumer} is not bound to any output")]
    UnboundInput {
        /// Component owning the slot.
        consumer: ComponentId,
        /// Slot name.
        slot: String,
    },

    /// A binding connects values of incompatible types.
    #[error("type mismatch binding {producer}.{output}: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Component publishing the output.
        producer: ComponentId,
        /// Output name.
        output: String,
        /// Type the consumer asked for.
        expected: ValueType,
        /// Type the producer (or consumer slot) declared.
        actual: ValueType,
    },

    /// The dependency edges contain a cycle.
    ///
    /// `cycle` is a closed walk: its first and last elements are the same
    /// component, and every consecutive pair is an edge.
    #[error("cyclic dependency detected: {}", join_cycle(.cycle))]
    CyclicDependency {
        /// Components along the cycle, first element repeated at the end.
        cycle: Vec<ComponentId>,
    },

    /// A reference was resolved before its producer published outputs.
    #[error("component {producer} has not published output \"{output}\" yet")]
    NotYetActivated {
        /// Component expected to publish the output.
        producer: ComponentId,
        /// Output name.
        output: String,
    },

    /// A component tried to publish outputs a second time.
    #[error("component {id} has already published its outputs")]
    AlreadyPublished {
        /// Component that published twice.
        id: ComponentId,
    },

    /// A component was moved along a transition its lifecycle forbids.
    #[error("component {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Component whose state was being changed.
        id: ComponentId,
        /// State it was in.
        from: ActivationState,
        /// State that was requested.
        to: ActivationState,
    },

    /// Persisted state lists live components the topology no longer
    /// declares, so their dependencies are unknown.
    #[error("live components missing from the topology: {}", join_ids(.ids))]
    UndeclaredLive {
        /// The missing components, ascending.
        ids: Vec<ComponentId>,
    },

    /// A topology document could not be interpreted.
    #[error("invalid declaration: {message}")]
    Declaration {
        /// Description of the problem.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StrataError {
    /// Returns whether this error describes a malformed declaration
    /// (as opposed to an environment or I/O problem).
    #[must_use]
    pub const fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateComponent { .. }
                | Self::UnknownComponent { .. }
                | Self::UnknownOutput { .. }
                | Self::UnknownInput { .. }
                | Self::InputAlreadyBound { .. }
                | Self::UnboundInput { .. }
                | Self::TypeMismatch { .. }
                | Self::CyclicDependency { .. }
                | Self::Declaration { .. }
        )
    }
}

fn join_cycle(cycle: &[ComponentId]) -> String {
    cycle
        .iter()
        .map(ComponentId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn join_ids(ids: &[ComponentId]) -> String {
    ids.iter()
        .map(ComponentId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;
