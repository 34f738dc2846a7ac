//! Solver configuration files.
//!
//! A config file is a JSON object of named options (see
//! [`SolverConfig::from_json`]); options it does not name keep their
//! defaults.

use std::path::Path;

use horizon_search::SolverConfig;

use crate::runner::RunError;

/// Read and validate a config file.
///
/// # Errors
///
/// I/O failures, invalid JSON, unknown or mistyped options and out-of-range
/// values.
pub fn load_config(path: &Path) -> Result<SolverConfig, RunError> {
    let text = std::fs::read_to_string(path).map_err(|e| RunError::io(path, &e))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| RunError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    Ok(SolverConfig::from_json(&value)?)
}
