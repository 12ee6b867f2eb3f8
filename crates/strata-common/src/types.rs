//! Domain primitive types used across the strata workspace.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a declared component.
///
/// Ids are assigned at declaration time and never reused, so they
/// double as the deterministic tie-break key for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Creates a component id from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Category of infrastructure a component represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// Virtual networks, subnets, VPN endpoints.
    Network,
    /// Security groups and firewall boundaries.
    SecurityBoundary,
    /// Clusters, services, task definitions.
    Compute,
    /// Object stores and shared file systems.
    Storage,
    /// Managed tables.
    Database,
    /// Container image repositories.
    Registry,
    /// Load balancers, DNS zones and records.
    Routing,
    /// Queues and topics.
    Messaging,
    /// Metric workspaces.
    Monitoring,
    /// Roles and their permission policies.
    Identity,
}

impl ComponentKind {
    /// Returns the kebab-case name used in declarations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::SecurityBoundary => "security-boundary",
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Database => "database",
            Self::Registry => "registry",
            Self::Routing => "routing",
            Self::Messaging => "messaging",
            Self::Monitoring => "monitoring",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of an output or input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// Free-form text.
    String,
    /// Signed integer.
    Number,
    /// Boolean flag.
    Bool,
    /// Provider-assigned resource identifier.
    Id,
    /// Fully qualified resource name.
    Arn,
    /// Endpoint or URI.
    Url,
    /// Ordered list of strings (subnet ids, DNS servers).
    StringList,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Id => "id",
            Self::Arn => "arn",
            Self::Url => "url",
            Self::StringList => "string-list",
        };
        f.write_str(name)
    }
}

/// A concrete, typed output value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Value {
    /// Free-form text.
    String(String),
    /// Signed integer.
    Number(i64),
    /// Boolean flag.
    Bool(bool),
    /// Provider-assigned resource identifier.
    Id(String),
    /// Fully qualified resource name.
    Arn(String),
    /// Endpoint or URI.
    Url(String),
    /// Ordered list of strings.
    StringList(Vec<String>),
}

impl Value {
    /// Returns the type tag of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Bool(_) => ValueType::Bool,
            Self::Id(_) => ValueType::Id,
            Self::Arn(_) => ValueType::Arn,
            Self::Url(_) => ValueType::Url,
            Self::StringList(_) => ValueType::StringList,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Id(s) | Self::Arn(s) | Self::Url(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::StringList(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Per-run lifecycle state of a component.
///
/// `Activated`, `Failed`, `Blocked` and `Cancelled` are terminal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum ActivationState {
    /// Registered, dependencies not yet settled.
    Pending = 0,
    /// Every producer it depends on has published its outputs.
    Ready = 1,
    /// Dispatched to the backend.
    Activating = 2,
    /// Backend confirmed creation and outputs are published.
    Activated = 3,
    /// Backend reported an error.
    Failed = 4,
    /// A producer it depends on failed, so it was never dispatched.
    Blocked = 5,
    /// The run was cancelled before it was dispatched.
    Cancelled = 6,
}

impl ActivationState {
    /// Returns whether no further transition is possible in this run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Activated | Self::Failed | Self::Blocked | Self::Cancelled
        )
    }

    /// Returns whether the lifecycle permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ready | Self::Blocked | Self::Cancelled)
                | (Self::Ready, Self::Activating | Self::Cancelled)
                | (Self::Activating, Self::Activated | Self::Failed)
        )
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Published outputs of one component, keyed by declared output name.
pub type Outputs = BTreeMap<String, Value>;

/// Declared output schema of one component.
pub type OutputSchema = BTreeMap<String, ValueType>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ids_order_lexicographically() {
        let mut ids = vec![ComponentId::new("vpc"), "alb".into(), "efs".into()];
        ids.sort();
        assert_eq!(ids, vec!["alb".into(), "efs".into(), ComponentId::new("vpc")]);
    }

    #[test]
    fn value_reports_its_type() {
        assert_eq!(Value::Arn("arn:x".into()).value_type(), ValueType::Arn);
        assert_eq!(
            Value::StringList(vec!["a".into()]).value_type(),
            ValueType::StringList
        );
    }

    #[test]
    fn value_serializes_with_type_tag() {
        let json = serde_json::to_string(&Value::Id("vpc-1".into())).expect("serialize");
        assert_eq!(json, r#"{"type":"id","value":"vpc-1"}"#);
    }

    #[test]
    fn kind_parses_kebab_case() {
        let kind: ComponentKind = serde_json::from_str("\"security-boundary\"").expect("parse");
        assert_eq!(kind, ComponentKind::SecurityBoundary);
        assert_eq!(kind.to_string(), "security-boundary");
    }

    #[test]
    fn lifecycle_only_moves_forward() {
        use ActivationState::{Activated, Activating, Blocked, Failed, Pending, Ready};
        assert!(Pending.can_advance_to(Ready));
        assert!(Ready.can_advance_to(Activating));
        assert!(Activating.can_advance_to(Activated));
        assert!(Activating.can_advance_to(Failed));
        assert!(Pending.can_advance_to(Blocked));
        assert!(!Activated.can_advance_to(Activating));
        assert!(!Failed.can_advance_to(Ready));
        assert!(!Pending.can_advance_to(Activated));
        assert!(Blocked.is_terminal());
        assert!(!Ready.is_terminal());
    }

    #[test]
    fn string_list_displays_bracketed() {
        let v = Value::StringList(vec!["a".into(), "b".into()]);
        assert_eq!(v.to_string(), "[a, b]");
    }
}
