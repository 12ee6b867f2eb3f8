//! Provisioning backend abstraction.
//!
//! The engines never interpret outputs beyond their declared names and
//! types; everything provider-specific lives behind
//! [`ProvisioningBackend`].

pub mod simulated;

use std::collections::BTreeMap;

use async_trait::async_trait;
use strata_common::error::StrataError;
use strata_common::types::{ComponentId, ComponentKind, OutputSchema, Outputs, Value};
use thiserror::Error;

/// Per-component failure reported while creating or destroying a resource.
///
/// These never abort a run; the engines fold them into their reports.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused or failed to provision the resource.
    #[error("provisioning failed: {message}")]
    Provision {
        /// Backend-supplied description.
        message: String,
    },

    /// The backend failed to decommission the resource.
    #[error("decommission failed: {message}")]
    Decommission {
        /// Backend-supplied description.
        message: String,
    },

    /// The backend's outputs do not honour the declared schema.
    #[error("backend returned malformed outputs for {id}: {message}")]
    MalformedOutputs {
        /// Component whose outputs were rejected.
        id: ComponentId,
        /// What was missing or mistyped.
        message: String,
    },

    /// Inputs could not be resolved or outputs could not be published.
    #[error(transparent)]
    Graph(#[from] StrataError),
}

/// Everything a backend needs to create one component.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Component being created.
    pub id: ComponentId,
    /// Infrastructure category.
    pub kind: ComponentKind,
    /// Resolved input values keyed by slot name, grant slots included.
    pub inputs: BTreeMap<String, Value>,
    /// Outputs the backend is expected to return.
    pub schema: OutputSchema,
}

/// Everything a backend needs to destroy one component.
#[derive(Debug, Clone)]
pub struct DestroyRequest {
    /// Component being destroyed.
    pub id: ComponentId,
    /// Infrastructure category.
    pub kind: ComponentKind,
    /// Outputs the component published when it was activated.
    pub outputs: Outputs,
}

/// External system performing resource creation and destruction.
///
/// Retry policy, if any, belongs to the implementor: each method is called
/// at most once per component per run.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Creates the resource and returns its published outputs.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the resource could not be created.
    async fn create(&self, request: &CreateRequest) -> Result<Outputs, BackendError>;

    /// Destroys a previously created resource.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the resource could not be destroyed.
    async fn destroy(&self, request: &DestroyRequest) -> Result<(), BackendError>;
}

/// Checks `outputs` against `schema`.
///
/// Undeclared outputs are dropped. With `strict`, a missing or mistyped
/// declared output is an error; otherwise whatever matches is kept.
///
/// # Errors
///
/// Returns [`BackendError::MalformedOutputs`] in strict mode when a
/// declared output is missing or has the wrong type.
pub fn conform(
    id: &ComponentId,
    schema: &OutputSchema,
    mut outputs: Outputs,
    strict: bool,
) -> Result<Outputs, BackendError> {
    let mut conformed = Outputs::new();
    for (name, &expected) in schema {
        match outputs.remove(name) {
            Some(value) if value.value_type() == expected => {
                let _ = conformed.insert(name.clone(), value);
            }
            Some(value) if strict => {
                return Err(BackendError::MalformedOutputs {
                    id: id.clone(),
                    message: format!(
                        "output \"{name}\" should be {expected}, got {}",
                        value.value_type()
                    ),
                });
            }
            None if strict => {
                return Err(BackendError::MalformedOutputs {
                    id: id.clone(),
                    message: format!("missing output \"{name}\""),
                });
            }
            Some(_) | None => {
                tracing::warn!(component = %id, output = %name, "declared output not honoured");
            }
        }
    }
    for name in outputs.keys() {
        tracing::debug!(component = %id, output = %name, "dropping undeclared output");
    }
    Ok(conformed)
}
