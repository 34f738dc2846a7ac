//! Harness runner: build a solver for a model, solve, and report.
//!
//! # Pipeline
//!
//! ```text
//! load_config() → Solver::new(model, algorithm, config)
//!   → [with BoundsLog sink if a log path is given] → solve()
//!   → RunReport (outcome + root action + config echo) → JSON
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use horizon_kernel::error::KernelError;
use horizon_kernel::hash::{canonical_hash, ContentHash, DOMAIN_RUN_REPORT};
use horizon_kernel::pomdp::TabularPomdp;
use horizon_search::{Algorithm, BoundsLog, SearchError, SolveOutcome, Solver, SolverConfig};

use crate::worlds::World;

/// Error during a harness run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model could not be built.
    #[error("model construction failed: {0}")]
    Model(#[from] KernelError),
    /// Pre-flight or runtime search failure.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// A file could not be read or written.
    #[error("I/O error on {}: {detail}", path.display())]
    Io { path: PathBuf, detail: String },
    /// A config file is not valid JSON.
    #[error("config file {} is not valid JSON: {detail}", path.display())]
    ConfigParse { path: PathBuf, detail: String },
    /// No fixture world has this name.
    #[error("unknown world '{name}'")]
    UnknownWorld { name: String },
}

impl RunError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            detail: err.to_string(),
        }
    }
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub algorithm: Algorithm,
    pub outcome: SolveOutcome,
    /// Action the solved policy takes at the initial state.
    pub root_action: Option<usize>,
    pub config: SolverConfig,
}

impl RunReport {
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "algorithm": self.algorithm.as_str(),
            "config": self.config.to_json_value(),
            "outcome": self.outcome.to_json_value(),
            "root_action": self.root_action,
        })
    }

    /// Digest of the report with wall-clock fields removed. Two runs with
    /// the same model, algorithm and config produce the same digest.
    #[must_use]
    pub fn digest(&self) -> ContentHash {
        let mut value = self.to_json_value();
        if let Some(outcome) = value.get_mut("outcome").and_then(Value::as_object_mut) {
            outcome.remove("elapsed_secs");
        }
        canonical_hash(DOMAIN_RUN_REPORT, value.to_string().as_bytes())
    }
}

/// Solve `model` with `algorithm`, optionally writing a bounds log.
///
/// # Errors
///
/// Search failures and bounds-log I/O failures.
pub fn run(
    model: &TabularPomdp,
    algorithm: Algorithm,
    config: SolverConfig,
    bounds_log: Option<&Path>,
) -> Result<RunReport, RunError> {
    let mut solver = Solver::new(model, algorithm, config.clone());
    if let Some(path) = bounds_log {
        let file = File::create(path).map_err(|e| RunError::io(path, &e))?;
        solver = solver.with_sink(BoundsLog::new(BufWriter::new(file)));
    }
    let outcome = solver.solve()?;
    let root_action = solver.choose_action(model.initial_belief())?;
    info!(
        algorithm = algorithm.as_str(),
        termination = outcome.termination.as_str(),
        "run finished"
    );
    Ok(RunReport {
        algorithm,
        outcome,
        root_action,
        config,
    })
}

/// [`run`] on a fixture world addressed by name.
///
/// # Errors
///
/// Unknown world names, plus everything [`run`] reports.
pub fn run_world(
    world: &str,
    algorithm: Algorithm,
    config: SolverConfig,
    bounds_log: Option<&Path>,
) -> Result<RunReport, RunError> {
    let world: World = world
        .parse()
        .map_err(|name| RunError::UnknownWorld { name })?;
    let model = world.model()?;
    run(&model, algorithm, config, bounds_log)
}
