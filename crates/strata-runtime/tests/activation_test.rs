//! End-to-end activation and teardown tests.
//!
//! These drive the full pipeline:
//! 1. Parse a YAML topology and replay it into a registry
//! 2. Build the dependency graph and schedule it
//! 3. Activate against a backend, with failures and cancellation
//! 4. Persist the report and tear everything down again

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use strata_common::config::StrataConfig;
use strata_common::types::{ComponentId, ComponentKind, Outputs, ValueType};
use strata_graph::declaration::Topology;
use strata_graph::graph::{self, Graph};
use strata_graph::registry::Registry;
use strata_graph::scheduler;
use strata_runtime::backend::simulated::SimulatedBackend;
use strata_runtime::backend::{BackendError, CreateRequest, DestroyRequest, ProvisioningBackend};
use strata_runtime::cancel::CancelSignal;
use strata_runtime::engine::ActivationEngine;
use strata_runtime::report::Outcome;
use strata_runtime::state;
use strata_runtime::teardown::TeardownExecutor;

const OBSERVABILITY_STACK: &str = include_str!("../../../demos/observability-stack.yaml");

fn observability_stack() -> Graph {
    let registry = Topology::from_yaml(OBSERVABILITY_STACK)
        .expect("parse")
        .into_registry()
        .expect("registry");
    graph::build(registry).expect("build")
}

fn independent(ids: &[&str]) -> Graph {
    let mut registry = Registry::new();
    for id in ids {
        let _ = registry
            .register(
                *id,
                ComponentKind::Storage,
                BTreeMap::new(),
                BTreeMap::from([("arn".to_owned(), ValueType::Arn)]),
            )
            .expect("register");
    }
    graph::build(registry).expect("build")
}

fn ids(batch: &[&str]) -> Vec<ComponentId> {
    batch.iter().map(|&s| ComponentId::new(s)).collect()
}

fn engine(backend: Arc<dyn ProvisioningBackend>) -> ActivationEngine {
    ActivationEngine::new(backend, StrataConfig::default())
}

// ── Scheduling ───────────────────────────────────────────────────────

#[test]
fn observability_stack_batches() {
    let g = observability_stack();
    assert_eq!(
        scheduler::order(&g).expect("order"),
        vec![
            ids(&["amp", "dynamodb", "ecr", "s3", "sqs", "vpc"]),
            ids(&["sg"]),
            ids(&["alb", "client-vpn", "efs"]),
            ids(&["efs-access-points", "route53"]),
            ids(&["ecs"]),
        ]
    );
}

// ── Activation ───────────────────────────────────────────────────────

#[tokio::test]
async fn observability_stack_activates_completely() {
    let g = observability_stack();
    let backend = Arc::new(SimulatedBackend::new());
    let report = engine(backend.clone())
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    assert!(report.is_complete());
    assert_eq!(report.activated().len(), 13);
    assert_eq!(backend.created().len(), 13);
    let ecs = report.outputs_of("ecs").expect("ecs outputs");
    assert_eq!(ecs["task_role_arn"].value_type(), ValueType::Arn);
}

#[tokio::test]
async fn storage_failure_blocks_only_its_dependents() {
    let g = observability_stack();
    let backend = Arc::new(SimulatedBackend::new().fail_create("efs"));
    let report = engine(backend)
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    assert_eq!(report.failed(), ids(&["efs"]));
    assert_eq!(report.blocked(), ids(&["ecs", "efs-access-points"]));
    for id in report.blocked() {
        assert_eq!(
            report.outcome(id.as_str()),
            Some(&Outcome::Blocked { by: "efs".into() })
        );
    }
    assert_eq!(report.outcome("route53"), Some(&Outcome::Activated));
    assert_eq!(report.outcome("client-vpn"), Some(&Outcome::Activated));
    assert_eq!(report.summary().activated, 10);
}

#[tokio::test]
async fn independent_component_survives_sibling_failure() {
    let mut registry = Registry::new();
    for id in ["a", "b", "c"] {
        let _ = registry
            .register(
                id,
                ComponentKind::Compute,
                BTreeMap::new(),
                BTreeMap::from([("arn".to_owned(), ValueType::Arn)]),
            )
            .expect("register");
    }
    registry.depends_on("c", "b").expect("c after b");
    let g = graph::build(registry).expect("build");

    let backend = Arc::new(SimulatedBackend::new().fail_create("b"));
    let report = engine(backend)
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    assert_eq!(report.outcome("a"), Some(&Outcome::Activated));
    assert!(matches!(report.outcome("b"), Some(Outcome::Failed { .. })));
    assert_eq!(report.outcome("c"), Some(&Outcome::Blocked { by: "b".into() }));
}

// ── Concurrency ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Event {
    Start(ComponentId),
    End(ComponentId),
}

/// Records when each create starts and finishes.
struct Timeline {
    inner: SimulatedBackend,
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl ProvisioningBackend for Timeline {
    async fn create(&self, request: &CreateRequest) -> Result<Outputs, BackendError> {
        self.events.lock().unwrap().push(Event::Start(request.id.clone()));
        let outputs = self.inner.create(request).await;
        self.events.lock().unwrap().push(Event::End(request.id.clone()));
        outputs
    }

    async fn destroy(&self, request: &DestroyRequest) -> Result<(), BackendError> {
        self.inner.destroy(request).await
    }
}

#[tokio::test]
async fn producers_finish_before_consumers_start() {
    let g = observability_stack();
    let backend = Arc::new(Timeline {
        inner: SimulatedBackend::new().with_delay(Duration::from_millis(5)),
        events: Mutex::new(Vec::new()),
    });
    let report = engine(backend.clone())
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");
    assert!(report.is_complete());

    let events = backend.events.lock().unwrap().clone();
    let position: HashMap<Event, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.clone(), i))
        .collect();
    for edge in g.edges() {
        assert!(
            position[&Event::End(edge.producer.clone())]
                < position[&Event::Start(edge.consumer.clone())],
            "{} must be activated before {} starts",
            edge.producer,
            edge.consumer
        );
    }
}

#[tokio::test]
async fn concurrency_is_bounded_by_config() {
    let g = independent(&["a", "b", "c", "d", "e", "f"]);
    let backend = Arc::new(SimulatedBackend::new().with_delay(Duration::from_millis(20)));
    let config = StrataConfig {
        max_concurrency: 2,
        ..StrataConfig::default()
    };
    let report = ActivationEngine::new(backend.clone(), config)
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    assert!(report.is_complete());
    assert_eq!(backend.peak_concurrency(), 2);
}

#[tokio::test]
async fn independent_batch_runs_in_parallel() {
    let g = independent(&["a", "b", "c", "d", "e", "f"]);
    let backend = Arc::new(SimulatedBackend::new().with_delay(Duration::from_millis(20)));
    let report = engine(backend.clone())
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    assert!(report.is_complete());
    assert_eq!(backend.peak_concurrency(), 6);
}

// ── Cancellation ─────────────────────────────────────────────────────

/// Raises the cancel signal while creating one component.
struct CancelsOn {
    inner: SimulatedBackend,
    trigger: ComponentId,
    signal: CancelSignal,
}

#[async_trait]
impl ProvisioningBackend for CancelsOn {
    async fn create(&self, request: &CreateRequest) -> Result<Outputs, BackendError> {
        if request.id == self.trigger {
            self.signal.raise();
        }
        self.inner.create(request).await
    }

    async fn destroy(&self, request: &DestroyRequest) -> Result<(), BackendError> {
        self.inner.destroy(request).await
    }
}

#[tokio::test]
async fn cancellation_lets_the_current_batch_finish() {
    let g = observability_stack();
    let signal = CancelSignal::new();
    let backend = Arc::new(CancelsOn {
        inner: SimulatedBackend::new().with_delay(Duration::from_millis(5)),
        trigger: "vpc".into(),
        signal: signal.clone(),
    });
    let report = engine(backend)
        .activate(&g, &signal)
        .await
        .expect("activate");

    assert_eq!(
        report.activated(),
        ids(&["amp", "dynamodb", "ecr", "s3", "sqs", "vpc"])
    );
    assert_eq!(report.cancelled().len(), 7);
    assert!(report.failed().is_empty());
}

// ── Teardown ─────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_persist_and_destroy() {
    let g = observability_stack();
    let backend = Arc::new(SimulatedBackend::new());
    let report = engine(backend.clone())
        .activate(&g, &CancelSignal::new())
        .await
        .expect("activate");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    state::save_report(&path, &report).expect("save");
    let restored = state::load_report(&path).expect("load");

    let teardown = TeardownExecutor::new(backend.clone(), StrataConfig::default())
        .run(&g, &restored, &CancelSignal::new())
        .await
        .expect("teardown");
    assert!(teardown.is_clean());

    let destroyed = backend.destroyed();
    assert_eq!(destroyed.len(), 13);
    let position: HashMap<&ComponentId, usize> =
        destroyed.iter().enumerate().map(|(i, id)| (id, i)).collect();
    for edge in g.edges() {
        assert!(position[&edge.consumer] < position[&edge.producer]);
    }
}
