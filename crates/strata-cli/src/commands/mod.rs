//! CLI command definitions and dispatch.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use strata_common::config::StrataConfig;
use strata_common::constants::{DEFAULT_MAX_CONCURRENCY, DEFAULT_STATE_FILE};
use strata_graph::declaration::Topology;
use strata_graph::graph::{self, Graph};
use strata_runtime::cancel::CancelSignal;

/// Strata: compose, order and provision infrastructure topologies.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the persisted activation report.
    #[arg(long, global = true, env = "STRATA_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Maximum number of components activated or destroyed at once.
    #[arg(
        long,
        global = true,
        env = "STRATA_MAX_CONCURRENCY",
        default_value_t = DEFAULT_MAX_CONCURRENCY
    )]
    pub max_concurrency: usize,

    /// Accept backend responses that do not match the declared outputs.
    #[arg(long, global = true)]
    pub lenient_outputs: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a topology document without touching any backend.
    Validate(validate::ValidateArgs),
    /// Show activation batches and teardown order.
    Plan(plan::PlanArgs),
    /// Activate every component of a topology.
    Apply(apply::ApplyArgs),
    /// Tear down what the last apply created.
    Destroy(destroy::DestroyArgs),
}

impl Cli {
    /// Builds the run configuration from global flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn config(&self) -> anyhow::Result<StrataConfig> {
        let config = StrataConfig {
            max_concurrency: self.max_concurrency,
            state_file: self.state_file.clone(),
            strict_outputs: !self.lenient_outputs,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    match cli.command {
        Command::Validate(args) => validate::execute(&args),
        Command::Plan(args) => plan::execute(&args),
        Command::Apply(args) => apply::execute(&args, config),
        Command::Destroy(args) => destroy::execute(&args, config),
    }
}

/// Loads a topology document and builds its dependency graph.
fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let topology = Topology::load(path)?;
    let registry = topology
        .into_registry()
        .with_context(|| format!("invalid topology in {}", path.display()))?;
    let graph = graph::build(registry)
        .with_context(|| format!("cannot build dependency graph for {}", path.display()))?;
    Ok(graph)
}

/// Returns a cancellation signal raised by Ctrl+C.
fn cancel_on_interrupt() -> anyhow::Result<CancelSignal> {
    let signal = CancelSignal::new();
    let handle = signal.clone();
    ctrlc::set_handler(move || handle.raise())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;
    Ok(signal)
}

/// Builds the async runtime used by `apply` and `destroy`.
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_build_the_config() {
        let cli = Cli::try_parse_from([
            "strata",
            "--max-concurrency",
            "3",
            "--lenient-outputs",
            "validate",
            "stack.yaml",
        ])
        .expect("parse");
        let config = cli.config().expect("config");
        assert_eq!(config.max_concurrency, 3);
        assert!(!config.strict_outputs);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::try_parse_from(["strata", "--max-concurrency", "0", "plan", "stack.yaml"])
            .expect("parse");
        assert!(cli.config().is_err());
    }

    #[test]
    fn apply_collects_repeated_failures() {
        let cli = Cli::try_parse_from([
            "strata", "apply", "stack.yaml", "--fail", "efs", "--fail", "sqs",
        ])
        .expect("parse");
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.fail, vec!["efs".to_owned(), "sqs".to_owned()]);
    }
}
