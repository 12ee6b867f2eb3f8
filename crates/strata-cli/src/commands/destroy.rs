//! `strata destroy`: Tear down what the last apply created.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use strata_common::config::StrataConfig;
use strata_common::constants::DEFAULT_TOPOLOGY_FILE;
use strata_runtime::backend::simulated::SimulatedBackend;
use strata_runtime::state;
use strata_runtime::teardown::{TeardownExecutor, TeardownReport};

use crate::output::{BOLD, DIM, GREEN, RED, RESET, format_duration, teardown_marker};

/// Arguments for the `destroy` command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Path to the topology document the state was applied from.
    #[arg(default_value = DEFAULT_TOPOLOGY_FILE)]
    pub file: PathBuf,

    /// Make the backend fail when destroying this component (repeatable).
    #[arg(long, value_name = "ID")]
    pub fail: Vec<String>,

    /// Print the teardown report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `destroy` command.
///
/// Loads the persisted activation report, destroys every activated
/// component consumers first, and rewrites the state with whatever is
/// still alive (removing it once nothing is).
///
/// # Errors
///
/// Returns an error if the state or topology cannot be loaded, or if any
/// component could not be destroyed.
pub fn execute(args: &DestroyArgs, config: StrataConfig) -> anyhow::Result<()> {
    let started = Instant::now();
    let graph = super::load_graph(&args.file)?;
    let mut report = state::load_report(&config.state_file)
        .with_context(|| format!("no state to destroy at {}", config.state_file.display()))?;

    let backend = args
        .fail
        .iter()
        .fold(SimulatedBackend::new(), |backend, id| backend.fail_destroy(id.as_str()));
    let cancel = super::cancel_on_interrupt()?;
    let executor = TeardownExecutor::new(Arc::new(backend), config.clone());
    let teardown = super::runtime()?.block_on(executor.run(&graph, &report, &cancel))?;

    report.forget(&teardown.destroyed());
    if report.live().is_empty() {
        state::clear(&config.state_file)?;
    } else {
        state::save_report(&config.state_file, &report)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&teardown)?);
    } else {
        print_report(&teardown, started.elapsed());
    }

    if !teardown.is_clean() {
        anyhow::bail!(
            "teardown incomplete: {} component(s) still exist",
            report.live().len()
        );
    }
    Ok(())
}

fn print_report(teardown: &TeardownReport, elapsed: std::time::Duration) {
    eprintln!();
    for (id, outcome) in &teardown.outcomes {
        eprintln!("    {} {BOLD}{id}{RESET} {DIM}{outcome}{RESET}", teardown_marker(outcome));
    }
    eprintln!();
    let color = if teardown.is_clean() { GREEN } else { RED };
    eprintln!(
        "  {color}{BOLD}{} destroyed{RESET} in {}",
        teardown.destroyed().len(),
        format_duration(elapsed)
    );
}
