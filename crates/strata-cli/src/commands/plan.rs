//! `strata plan`: Display activation batches and teardown order.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use strata_common::constants::{DEFAULT_TOPOLOGY_FILE, GRANT_SLOT_PREFIX};
use strata_graph::graph::Graph;
use strata_graph::scheduler::{self, Batch};
use strata_graph::teardown;

use crate::output::{BOLD, CYAN, DIM, RESET, format_batch, rule};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the topology document.
    #[arg(default_value = DEFAULT_TOPOLOGY_FILE)]
    pub file: PathBuf,

    /// Print the plan as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Builds the dependency graph, resolves the activation batches and the
/// reversed teardown batches, and displays both.
///
/// # Errors
///
/// Returns an error if parsing, validation, or graph resolution fails.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let graph = super::load_graph(&args.file)?;
    let activation = scheduler::order(&graph)?;
    let teardown = teardown::reverse_order(&graph)?;

    if args.json {
        let plan = json!({
            "file": args.file.display().to_string(),
            "activation": activation,
            "teardown": teardown,
            "edges": graph.edges().iter().map(|e| json!({
                "producer": e.producer,
                "consumer": e.consumer,
                "reason": e.reason.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_activation(&graph, &args.file, &activation);
    print_teardown(&teardown);
    Ok(())
}

fn print_activation(graph: &Graph, file: &std::path::Path, batches: &[Batch]) {
    eprintln!();
    eprintln!("  {BOLD}Activation plan for {}{RESET}", file.display());
    eprintln!("  {}", rule(40));
    for (index, batch) in batches.iter().enumerate() {
        eprintln!();
        eprintln!("  {CYAN}batch {index}{RESET}");
        for id in batch {
            let Ok(component) = graph.component(id.as_str()) else {
                continue;
            };
            eprintln!("    + {BOLD}{id}{RESET} {DIM}({}){RESET}", component.kind);
            let bindings = component
                .bindings()
                .filter(|(slot, _)| !slot.starts_with(GRANT_SLOT_PREFIX));
            for (slot, binding) in bindings {
                eprintln!("        {slot} {DIM}<-{RESET} {binding}");
            }
            for producer in &component.depends_on {
                eprintln!("        {DIM}after{RESET} {producer}");
            }
            for grant in &component.grants {
                eprintln!(
                    "        {DIM}grant{RESET} {} on {}.{}",
                    grant.actions.join(", "),
                    grant.resource.producer,
                    grant.resource.output
                );
            }
        }
    }
    eprintln!();
    eprintln!(
        "  {} component(s) in {} batch(es).",
        graph.len(),
        batches.len()
    );
}

fn print_teardown(batches: &[Batch]) {
    eprintln!();
    eprintln!("  {BOLD}Teardown order{RESET}");
    for (index, batch) in batches.iter().enumerate() {
        eprintln!("    {index}: {}", format_batch(batch));
    }
    eprintln!();
}
