//! Typed references from a consumer's input to a producer's output.
//!
//! A reference is checked against the producer's declared output schema
//! when it is bound, and turned into a concrete value only once the
//! producer has published its outputs to the run's [`Ledger`].

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};
use strata_common::types::{ComponentId, Value, ValueType};

use crate::ledger::{ActivationState, Ledger};
use crate::registry::Component;

/// Handle to one named output of one component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputReference {
    /// Component publishing the value.
    pub producer: ComponentId,
    /// Declared output name.
    pub output: String,
    /// Type the consumer expects.
    pub expected: ValueType,
}

impl fmt::Display for OutputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.producer, self.output, self.expected)
    }
}

/// Checks that `producer` declares `output` with type `expected` and
/// returns the reference.
///
/// # Errors
///
/// Returns [`StrataError::UnknownOutput`] if the output was never declared,
/// or [`StrataError::TypeMismatch`] if it was declared with another type.
pub fn check(producer: &Component, output: &str, expected: ValueType) -> Result<OutputReference> {
    let Some(&declared) = producer.outputs.get(output) else {
        return Err(StrataError::UnknownOutput {
            producer: producer.id.clone(),
            output: output.to_owned(),
        });
    };
    if declared != expected {
        return Err(StrataError::TypeMismatch {
            producer: producer.id.clone(),
            output: output.to_owned(),
            expected,
            actual: declared,
        });
    }
    Ok(OutputReference {
        producer: producer.id.clone(),
        output: output.to_owned(),
        expected,
    })
}

/// Resolves a reference to the value its producer published.
///
/// Resolving the same reference repeatedly returns equal values: published
/// outputs are write-once.
///
/// # Errors
///
/// Returns [`StrataError::NotYetActivated`] if the producer has not reached
/// [`ActivationState::Activated`], [`StrataError::UnknownComponent`] if the
/// ledger does not track it, and [`StrataError::UnknownOutput`] or
/// [`StrataError::TypeMismatch`] if the published value does not honour
/// the declared schema.
pub fn resolve(reference: &OutputReference, ledger: &Ledger) -> Result<Value> {
    let state = ledger
        .state(&reference.producer)
        .ok_or_else(|| StrataError::UnknownComponent {
            id: reference.producer.clone(),
        })?;
    let outputs = match (state, ledger.outputs(&reference.producer)) {
        (ActivationState::Activated, Some(outputs)) => outputs,
        _ => {
            return Err(StrataError::NotYetActivated {
                producer: reference.producer.clone(),
                output: reference.output.clone(),
            });
        }
    };
    let value = outputs
        .get(&reference.output)
        .ok_or_else(|| StrataError::UnknownOutput {
            producer: reference.producer.clone(),
            output: reference.output.clone(),
        })?;
    if value.value_type() != reference.expected {
        return Err(StrataError::TypeMismatch {
            producer: reference.producer.clone(),
            output: reference.output.clone(),
            expected: reference.expected,
            actual: value.value_type(),
        });
    }
    Ok(value.clone())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use strata_common::types::{ComponentKind, Outputs};

    use super::*;

    fn queue() -> Component {
        Component::new(
            "queue".into(),
            ComponentKind::Messaging,
            BTreeMap::new(),
            BTreeMap::from([
                ("queue_url".to_owned(), ValueType::Url),
                ("queue_arn".to_owned(), ValueType::Arn),
            ]),
        )
    }

    fn activated_ledger(outputs: Outputs) -> Ledger {
        let id = ComponentId::new("queue");
        let ledger = Ledger::new([id.clone()]);
        ledger.advance(&id, ActivationState::Ready).expect("ready");
        ledger
            .advance(&id, ActivationState::Activating)
            .expect("activating");
        ledger.publish(&id, outputs).expect("publish");
        ledger
    }

    #[test]
    fn check_accepts_declared_output() {
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        assert_eq!(reference.producer.as_str(), "queue");
        assert_eq!(reference.to_string(), "queue.queue_url (url)");
    }

    #[test]
    fn check_rejects_undeclared_output() {
        let err = check(&queue(), "dlq_url", ValueType::Url).unwrap_err();
        assert!(matches!(
            err,
            StrataError::UnknownOutput { ref output, .. } if output == "dlq_url"
        ));
    }

    #[test]
    fn check_rejects_wrong_type() {
        let err = check(&queue(), "queue_arn", ValueType::Url).unwrap_err();
        assert!(matches!(
            err,
            StrataError::TypeMismatch {
                expected: ValueType::Url,
                actual: ValueType::Arn,
                ..
            }
        ));
    }

    #[test]
    fn resolve_before_activation_fails() {
        let ledger = Ledger::new([ComponentId::new("queue")]);
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        let err = resolve(&reference, &ledger).unwrap_err();
        assert!(matches!(err, StrataError::NotYetActivated { .. }));
    }

    #[test]
    fn resolve_is_idempotent() {
        let ledger = activated_ledger(BTreeMap::from([(
            "queue_url".to_owned(),
            Value::Url("https://sqs/queue".into()),
        )]));
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        let first = resolve(&reference, &ledger).expect("first");
        let second = resolve(&reference, &ledger).expect("second");
        assert_eq!(first, second);
        assert_eq!(first, Value::Url("https://sqs/queue".into()));
    }

    #[test]
    fn resolve_detects_missing_published_output() {
        let ledger = activated_ledger(BTreeMap::new());
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        let err = resolve(&reference, &ledger).unwrap_err();
        assert!(matches!(err, StrataError::UnknownOutput { .. }));
    }

    #[test]
    fn resolve_detects_mistyped_published_output() {
        let ledger = activated_ledger(BTreeMap::from([(
            "queue_url".to_owned(),
            Value::String("not a url".into()),
        )]));
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        let err = resolve(&reference, &ledger).unwrap_err();
        assert!(matches!(err, StrataError::TypeMismatch { .. }));
    }

    #[test]
    fn resolve_unknown_producer_fails() {
        let ledger = Ledger::new(Vec::<ComponentId>::new());
        let reference = check(&queue(), "queue_url", ValueType::Url).expect("check");
        let err = resolve(&reference, &ledger).unwrap_err();
        assert!(matches!(err, StrataError::UnknownComponent { .. }));
    }
}
