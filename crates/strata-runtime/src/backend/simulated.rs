//! In-memory backend that synthesizes outputs instead of touching a
//! provider.
//!
//! Used by the CLI for dry runs and by tests to inject failures, delays and
//! malformed responses.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use strata_common::types::{ComponentId, ComponentKind, Outputs, Value, ValueType};

use super::{BackendError, CreateRequest, DestroyRequest, ProvisioningBackend};

/// One backend call, in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `create` was called for the component.
    Create(ComponentId),
    /// `destroy` was called for the component.
    Destroy(ComponentId),
}

/// Deterministic in-memory backend.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    fail_create: BTreeSet<ComponentId>,
    fail_destroy: BTreeSet<ComponentId>,
    malformed: BTreeSet<ComponentId>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SimulatedBackend {
    /// Creates a backend where every call succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create` fail for `id`.
    #[must_use]
    pub fn fail_create(mut self, id: impl Into<ComponentId>) -> Self {
        let _ = self.fail_create.insert(id.into());
        self
    }

    /// Makes `destroy` fail for `id`.
    #[must_use]
    pub fn fail_destroy(mut self, id: impl Into<ComponentId>) -> Self {
        let _ = self.fail_destroy.insert(id.into());
        self
    }

    /// Makes `create` for `id` succeed with no outputs at all.
    #[must_use]
    pub fn malformed(mut self, id: impl Into<ComponentId>) -> Self {
        let _ = self.malformed.insert(id.into());
        self
    }

    /// Makes every call take `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the ids `create` was called for, in call order.
    #[must_use]
    pub fn created(&self) -> Vec<ComponentId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(id) => Some(id),
                Call::Destroy(_) => None,
            })
            .collect()
    }

    /// Returns the ids `destroy` was called for, in call order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<ComponentId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Destroy(id) => Some(id),
                Call::Create(_) => None,
            })
            .collect()
    }

    /// Highest number of calls that were in progress at the same time.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    async fn in_flight<T>(&self, work: impl FnOnce() -> T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.peak.fetch_max(now, Ordering::AcqRel);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = work();
        let _ = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        result
    }
}

#[async_trait]
impl ProvisioningBackend for SimulatedBackend {
    async fn create(&self, request: &CreateRequest) -> Result<Outputs, BackendError> {
        self.record(Call::Create(request.id.clone()));
        self.in_flight(|| {
            if self.fail_create.contains(&request.id) {
                return Err(BackendError::Provision {
                    message: format!("simulated failure creating {}", request.id),
                });
            }
            if self.malformed.contains(&request.id) {
                return Ok(Outputs::new());
            }
            Ok(request
                .schema
                .iter()
                .map(|(name, &ty)| (name.clone(), synthesize(&request.id, request.kind, name, ty)))
                .collect())
        })
        .await
    }

    async fn destroy(&self, request: &DestroyRequest) -> Result<(), BackendError> {
        self.record(Call::Destroy(request.id.clone()));
        self.in_flight(|| {
            if self.fail_destroy.contains(&request.id) {
                Err(BackendError::Decommission {
                    message: format!("simulated failure destroying {}", request.id),
                })
            } else {
                Ok(())
            }
        })
        .await
    }
}

/// Builds a stable placeholder value for one declared output.
fn synthesize(id: &ComponentId, kind: ComponentKind, output: &str, ty: ValueType) -> Value {
    match ty {
        ValueType::String => Value::String(format!("{id}-{output}")),
        ValueType::Number => Value::Number(i64::try_from(id.as_str().len()).unwrap_or(i64::MAX)),
        ValueType::Bool => Value::Bool(true),
        ValueType::Id => Value::Id(format!("{}-{id}", kind.as_str())),
        ValueType::Arn => Value::Arn(format!("arn:strata:{kind}:::{id}/{output}")),
        ValueType::Url => Value::Url(format!("https://{id}.strata.internal/{output}")),
        ValueType::StringList => {
            Value::StringList(vec![format!("{id}-{output}-a"), format!("{id}-{output}-b")])
        }
    }
}
