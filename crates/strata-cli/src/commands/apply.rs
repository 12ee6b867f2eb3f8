//! `strata apply`: Activate every component of a topology.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use strata_common::config::StrataConfig;
use strata_common::constants::DEFAULT_TOPOLOGY_FILE;
use strata_graph::scheduler;
use strata_runtime::backend::simulated::SimulatedBackend;
use strata_runtime::engine::ActivationEngine;
use strata_runtime::report::ActivationReport;
use strata_runtime::state;

use crate::output::{BOLD, DIM, GREEN, RED, RESET, activation_marker, format_duration};

/// Arguments for the `apply` command.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the topology document.
    #[arg(default_value = DEFAULT_TOPOLOGY_FILE)]
    pub file: PathBuf,

    /// Make the backend fail when creating this component (repeatable).
    #[arg(long, value_name = "ID")]
    pub fail: Vec<String>,

    /// Simulated latency of every backend call, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub delay_ms: u64,

    /// Print the activation report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `apply` command.
///
/// Activates the topology against the simulated backend, persists the
/// report to the state file and prints it. Ctrl+C stops further batches
/// from starting.
///
/// # Errors
///
/// Returns an error if the topology is invalid, the state file cannot be
/// written, or any component did not end up activated.
pub fn execute(args: &ApplyArgs, config: StrataConfig) -> anyhow::Result<()> {
    let started = Instant::now();
    let graph = super::load_graph(&args.file)?;
    let batches = scheduler::order(&graph)?;
    refuse_live_state(&config.state_file)?;

    let mut backend = args
        .fail
        .iter()
        .fold(SimulatedBackend::new(), |backend, id| backend.fail_create(id.as_str()));
    if args.delay_ms > 0 {
        backend = backend.with_delay(Duration::from_millis(args.delay_ms));
    }

    let cancel = super::cancel_on_interrupt()?;
    let engine = ActivationEngine::new(Arc::new(backend), config.clone());
    let report = super::runtime()?.block_on(engine.run(&graph, &batches, &cancel));
    state::save_report(&config.state_file, &report)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, started.elapsed(), &config.state_file);
    }

    if !report.is_complete() {
        anyhow::bail!("apply incomplete: {}", report.summary());
    }
    Ok(())
}

/// Refuses to overwrite a state file that still lists live components.
fn refuse_live_state(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let previous = state::load_report(path)?;
    let live = previous.live();
    if !live.is_empty() {
        anyhow::bail!(
            "{} still lists {} live component(s); run `strata destroy` first",
            path.display(),
            live.len()
        );
    }
    Ok(())
}

fn print_report(report: &ActivationReport, elapsed: Duration, state_file: &Path) {
    eprintln!();
    for (id, outcome) in &report.outcomes {
        eprintln!("    {} {BOLD}{id}{RESET} {DIM}{outcome}{RESET}", activation_marker(outcome));
    }
    eprintln!();
    let color = if report.is_complete() { GREEN } else { RED };
    eprintln!(
        "  {color}{BOLD}{}{RESET} in {}",
        report.summary(),
        format_duration(elapsed)
    );
    eprintln!("  {DIM}State: {}{RESET}", state_file.display());
}
