//! Node registry: every declared component, its input slots, output
//! schema, explicit dependencies and permission grants.
//!
//! The registry is populated by explicit `register` / `bind` /
//! `depends_on` / `grant` calls and becomes read-only once handed to
//! [`crate::graph::build`].

use std::collections::{BTreeMap, BTreeSet};

use strata_common::constants::GRANT_SLOT_PREFIX;
use strata_common::error::{Result, StrataError};
use strata_common::types::{ComponentId, ComponentKind, OutputSchema, ValueType};

use crate::reference::{self, OutputReference};

/// A required input of a component and the output it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    /// Type the component expects for this input.
    pub expected: ValueType,
    /// Producer output feeding the slot, once bound.
    pub binding: Option<OutputReference>,
}

/// A permission granted to a component on another component's resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Resource output the permission applies to.
    pub resource: OutputReference,
    /// Actions allowed on the resource.
    pub actions: Vec<String>,
}

/// A declared infrastructure component.
#[derive(Debug, Clone)]
pub struct Component {
    /// Stable identifier.
    pub id: ComponentId,
    /// Infrastructure category.
    pub kind: ComponentKind,
    /// Required inputs keyed by slot name.
    pub inputs: BTreeMap<String, InputSlot>,
    /// Outputs published on activation, keyed by name.
    pub outputs: OutputSchema,
    /// Components that must exist first, with no data flowing.
    pub depends_on: BTreeSet<ComponentId>,
    /// Permissions granted to this component.
    pub grants: Vec<Grant>,
}

impl Component {
    /// Creates a component with unbound inputs.
    #[must_use]
    pub fn new(
        id: ComponentId,
        kind: ComponentKind,
        required_inputs: BTreeMap<String, ValueType>,
        declared_outputs: OutputSchema,
    ) -> Self {
        let inputs = required_inputs
            .into_iter()
            .map(|(slot, expected)| {
                let slot_state = InputSlot {
                    expected,
                    binding: None,
                };
                (slot, slot_state)
            })
            .collect();
        Self {
            id,
            kind,
            inputs,
            outputs: declared_outputs,
            depends_on: BTreeSet::new(),
            grants: Vec::new(),
        }
    }

    /// Iterates over bound input slots in slot-name order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &OutputReference)> {
        self.inputs
            .iter()
            .filter_map(|(slot, state)| state.binding.as_ref().map(|r| (slot.as_str(), r)))
    }
}

/// Registry of declared components, ordered by id.
#[derive(Debug, Default)]
pub struct Registry {
    components: BTreeMap<ComponentId, Component>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a component.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::DuplicateComponent`] if the id is taken.
    pub fn register(
        &mut self,
        id: impl Into<ComponentId>,
        kind: ComponentKind,
        required_inputs: BTreeMap<String, ValueType>,
        declared_outputs: OutputSchema,
    ) -> Result<ComponentId> {
        let id = id.into();
        if self.components.contains_key(&id) {
            return Err(StrataError::DuplicateComponent { id });
        }
        tracing::debug!(component = %id, %kind, "component registered");
        let component = Component::new(id.clone(), kind, required_inputs, declared_outputs);
        let _ = self.components.insert(id.clone(), component);
        Ok(id)
    }

    /// Looks up a component.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] if absent.
    pub fn get(&self, id: &str) -> Result<&Component> {
        self.components
            .get(id)
            .ok_or_else(|| StrataError::UnknownComponent { id: id.into() })
    }

    /// Binds `consumer`'s input `slot` to `producer`'s output.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] for an unknown consumer or
    /// producer, [`StrataError::UnknownOutput`] if the producer never declared
    /// `output`, [`StrataError::UnknownInput`] if the consumer never declared
    /// `slot`, [`StrataError::TypeMismatch`] if either side disagrees with
    /// `expected`, and [`StrataError::InputAlreadyBound`] on rebinding.
    pub fn bind(
        &mut self,
        consumer: &str,
        slot: &str,
        producer: &str,
        output: &str,
        expected: ValueType,
    ) -> Result<OutputReference> {
        let _ = self.get(consumer)?;
        let reference = reference::check(self.get(producer)?, output, expected)?;
        let consumer_component = self.get_mut(consumer)?;

        let Some(slot_state) = consumer_component.inputs.get_mut(slot) else {
            return Err(StrataError::UnknownInput {
                consumer: consumer.into(),
                slot: slot.to_owned(),
            });
        };
        if slot_state.expected != expected {
            return Err(StrataError::TypeMismatch {
                producer: reference.producer,
                output: reference.output,
                expected: slot_state.expected,
                actual: expected,
            });
        }
        if slot_state.binding.is_some() {
            return Err(StrataError::InputAlreadyBound {
                consumer: consumer.into(),
                slot: slot.to_owned(),
            });
        }
        slot_state.binding = Some(reference.clone());
        tracing::debug!(%consumer, %slot, %reference, "input bound");
        Ok(reference)
    }

    /// Declares that `consumer` must be activated after `producer` even
    /// though no data flows between them.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] if either id is unknown.
    pub fn depends_on(&mut self, consumer: &str, producer: &str) -> Result<()> {
        let producer_id = self.get(producer)?.id.clone();
        let consumer_component = self.get_mut(consumer)?;
        let _ = consumer_component.depends_on.insert(producer_id);
        tracing::debug!(%consumer, %producer, "explicit dependency declared");
        Ok(())
    }

    /// Grants `subject` the given actions on `resource`'s `output`.
    ///
    /// The grant is wired as a bound input slot named
    /// `grant:<resource>.<output>` on the subject, so it orders the subject
    /// after the resource exactly like any other data dependency. Granting
    /// the same resource output twice merges the actions.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnknownComponent`] for unknown ids and
    /// [`StrataError::UnknownOutput`] if the resource never declared `output`.
    pub fn grant<I, S>(
        &mut self,
        subject: &str,
        resource: &str,
        output: &str,
        actions: I,
    ) -> Result<OutputReference>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _ = self.get(subject)?;
        let producer = self.get(resource)?;
        let declared = producer
            .outputs
            .get(output)
            .copied()
            .ok_or_else(|| StrataError::UnknownOutput {
                producer: producer.id.clone(),
                output: output.to_owned(),
            })?;
        let reference = reference::check(producer, output, declared)?;
        let slot = format!("{GRANT_SLOT_PREFIX}{resource}.{output}");
        let actions: Vec<String> = actions.into_iter().map(Into::into).collect();

        let subject_component = self.get_mut(subject)?;
        let _ = subject_component
            .inputs
            .entry(slot)
            .or_insert_with(|| InputSlot {
                expected: declared,
                binding: Some(reference.clone()),
            });
        if let Some(existing) = subject_component
            .grants
            .iter_mut()
            .find(|g| g.resource == reference)
        {
            for action in actions {
                if !existing.actions.contains(&action) {
                    existing.actions.push(action);
                }
            }
        } else {
            subject_component.grants.push(Grant {
                resource: reference.clone(),
                actions,
            });
        }
        tracing::debug!(%subject, %reference, "grant declared");
        Ok(reference)
    }

    /// Checks that every declared input slot is bound.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::UnboundInput`] for the first unbound slot in
    /// component-id, then slot-name, order.
    pub fn check_complete(&self) -> Result<()> {
        for component in self.components.values() {
            if let Some((slot, _)) = component
                .inputs
                .iter()
                .find(|(_, state)| state.binding.is_none())
            {
                return Err(StrataError::UnboundInput {
                    consumer: component.id.clone(),
                    slot: slot.clone(),
                });
            }
        }
        Ok(())
    }

    /// Iterates over components in ascending id order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Returns whether a component with this id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Component> {
        self.components
            .get_mut(id)
            .ok_or_else(|| StrataError::UnknownComponent { id: id.into() })
    }
}
