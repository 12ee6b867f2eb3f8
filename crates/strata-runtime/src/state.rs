//! Persisted run state.
//!
//! The last activation report is kept as pretty JSON so a later teardown
//! knows what exists without querying the provider.

use std::path::Path;

use strata_common::error::{Result, StrataError};

use crate::report::ActivationReport;

/// Writes `report` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be written, or
/// [`StrataError::Serialization`] if the report cannot be encoded.
pub fn save_report(path: &Path, report: &ActivationReport) -> Result<()> {
    tracing::debug!(path = %path.display(), run = %report.run_id, "saving activation report");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StrataError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| StrataError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reads the report previously written by [`save_report`].
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be read, or
/// [`StrataError::Serialization`] if it is not a valid report.
pub fn load_report(path: &Path) -> Result<ActivationReport> {
    tracing::debug!(path = %path.display(), "loading activation report");
    let content = std::fs::read_to_string(path).map_err(|e| StrataError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Removes the persisted report, if any.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file exists but cannot be removed.
pub fn clear(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StrataError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
