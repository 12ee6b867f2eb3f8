//! YAML topology documents.
//!
//! A document lists components with their output schemas, input bindings,
//! explicit dependencies and grants:
//!
//! ```yaml
//! components:
//!   - id: vpc
//!     kind: network
//!     outputs:
//!       vpc_id: id
//!   - id: sg
//!     kind: security-boundary
//!     inputs:
//!       vpc_id: { type: id, from: vpc.vpc_id }
//!     outputs:
//!       alb_sg: id
//! ```
//!
//! [`Topology::into_registry`] replays the document as registry calls, so a
//! malformed document fails with the same errors as the programmatic API.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};
use strata_common::types::{ComponentKind, OutputSchema, ValueType};

use crate::registry::Registry;

/// Root of a topology document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Declared components, in document order.
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
}

/// One declared component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDecl {
    /// Stable component id.
    pub id: String,
    /// Infrastructure category.
    pub kind: ComponentKind,
    /// Output schema.
    #[serde(default)]
    pub outputs: OutputSchema,
    /// Required inputs keyed by slot name.
    #[serde(default)]
    pub inputs: BTreeMap<String, InputDecl>,
    /// Components to order before this one without data flow.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Permissions granted to this component.
    #[serde(default)]
    pub grants: Vec<GrantDecl>,
}

/// A required input and where its value comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDecl {
    /// Expected value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Producer output, written `<component>.<output>`.
    pub from: String,
}

/// A permission on another component's resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantDecl {
    /// Resource output, written `<component>.<output>`.
    pub resource: String,
    /// Allowed actions.
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Topology {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Declaration`] if the YAML is malformed or does
    /// not match the document schema.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| StrataError::Declaration {
            message: e.to_string(),
        })
    }

    /// Reads and parses a YAML document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Io`] if the file cannot be read, or
    /// [`StrataError::Declaration`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading topology");
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Replays the document into a fresh registry.
    ///
    /// Every component is registered before any binding is made, so
    /// components may reference ones declared later in the document.
    ///
    /// # Errors
    ///
    /// Returns the first registry error encountered, or
    /// [`StrataError::Declaration`] for a malformed `<component>.<output>`.
    pub fn into_registry(self) -> Result<Registry> {
        let mut registry = Registry::new();
        for decl in &self.components {
            let inputs = decl
                .inputs
                .iter()
                .map(|(slot, input)| (slot.clone(), input.value_type))
                .collect();
            let _ = registry.register(decl.id.as_str(), decl.kind, inputs, decl.outputs.clone())?;
        }
        for decl in &self.components {
            for (slot, input) in &decl.inputs {
                let (producer, output) = split_reference(&input.from)?;
                let _ = registry.bind(&decl.id, slot, producer, output, input.value_type)?;
            }
            for producer in &decl.depends_on {
                registry.depends_on(&decl.id, producer)?;
            }
            for grant in &decl.grants {
                let (resource, output) = split_reference(&grant.resource)?;
                let _ = registry.grant(&decl.id, resource, output, grant.actions.iter().cloned())?;
            }
        }
        Ok(registry)
    }
}

/// Splits `<component>.<output>` on its last dot.
fn split_reference(raw: &str) -> Result<(&str, &str)> {
    match raw.rsplit_once('.') {
        Some((component, output)) if !component.is_empty() && !output.is_empty() => {
            Ok((component, output))
        }
        _ => Err(StrataError::Declaration {
            message: format!("expected <component>.<output>, got \"{raw}\""),
        }),
    }
}
