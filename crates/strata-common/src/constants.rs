//! Workspace-wide constants and default paths.

/// Default path of the persisted activation report.
pub const DEFAULT_STATE_FILE: &str = ".strata/state.json";

/// Default topology document looked up by the CLI.
pub const DEFAULT_TOPOLOGY_FILE: &str = "strata.yaml";

/// Default bound on concurrently activating components within a batch.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Prefix of the input slot a permission grant is bound to.
pub const GRANT_SLOT_PREFIX: &str = "grant:";
