//! `strata validate`: Check a topology document.

use std::path::PathBuf;

use clap::Args;
use strata_common::constants::DEFAULT_TOPOLOGY_FILE;

use crate::output::{BOLD, GREEN, RESET};

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the topology document.
    #[arg(default_value = DEFAULT_TOPOLOGY_FILE)]
    pub file: PathBuf,
}

/// Executes the `validate` command.
///
/// Replays the document into a registry and builds the dependency graph,
/// which surfaces every declaration error (duplicates, unknown references,
/// type mismatches, unbound inputs, cycles) before any backend is touched.
///
/// # Errors
///
/// Returns the first declaration or graph error found.
pub fn execute(args: &ValidateArgs) -> anyhow::Result<()> {
    let graph = super::load_graph(&args.file)?;
    eprintln!(
        "  {GREEN}\u{2713}{RESET} {BOLD}{}{RESET} is valid: {} component(s), {} edge(s)",
        args.file.display(),
        graph.len(),
        graph.edges().len()
    );
    Ok(())
}
