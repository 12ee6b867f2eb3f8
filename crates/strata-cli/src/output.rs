//! Formatted output helpers for CLI commands.
//!
//! Colored outcome markers, batch listings and human-readable durations.

use std::time::Duration;

use strata_runtime::report::Outcome;
use strata_runtime::teardown::TeardownOutcome;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Heavy horizontal rule used under headings.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}

/// Colored bullet for an activation outcome.
#[must_use]
pub fn activation_marker(outcome: &Outcome) -> String {
    let color = match outcome {
        Outcome::Activated => GREEN,
        Outcome::Failed { .. } => RED,
        Outcome::Blocked { .. } | Outcome::Cancelled => YELLOW,
    };
    format!("{color}\u{25cf}{RESET}")
}

/// Colored bullet for a teardown outcome.
#[must_use]
pub fn teardown_marker(outcome: &TeardownOutcome) -> String {
    let color = match outcome {
        TeardownOutcome::Destroyed => GREEN,
        TeardownOutcome::Failed { .. } => RED,
        TeardownOutcome::Retained { .. } | TeardownOutcome::Cancelled => YELLOW,
    };
    format!("{color}\u{25cf}{RESET}")
}

/// Formats a duration as seconds with one decimal, or milliseconds below
/// one second.
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Joins a batch of ids for a single-line listing.
#[must_use]
pub fn format_batch<T: std::fmt::Display>(batch: &[T]) -> String {
    batch
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_uses_millis_below_a_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn format_duration_displays_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1_540)), "1.5s");
    }

    #[test]
    fn format_batch_joins_with_commas() {
        assert_eq!(format_batch(&["alb", "efs"]), "alb, efs");
    }

    #[test]
    fn markers_are_colored_by_outcome() {
        assert!(activation_marker(&Outcome::Activated).starts_with(GREEN));
        assert!(activation_marker(&Outcome::Cancelled).starts_with(YELLOW));
        assert!(teardown_marker(&TeardownOutcome::Failed { reason: "x".into() }).starts_with(RED));
    }
}
