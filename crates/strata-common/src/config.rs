//! Global configuration model for a strata run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Root configuration for activation and teardown runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Upper bound on components activating concurrently inside one batch.
    pub max_concurrency: usize,
    /// Path of the persisted activation report.
    pub state_file: PathBuf,
    /// Fail a component whose backend response does not match its
    /// declared output schema.
    pub strict_outputs: bool,
}

impl StrataConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if `max_concurrency` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(StrataError::Config {
                message: "max_concurrency must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            max_concurrency: crate::constants::DEFAULT_MAX_CONCURRENCY,
            state_file: PathBuf::from(crate::constants::DEFAULT_STATE_FILE),
            strict_outputs: true,
        }
    }
}
