//! Typed search errors.
//!
//! `SearchError` covers pre-flight failures (configuration, missing or
//! uninitializable bounds) and the fatal consistency failures that abort a
//! run. Budget exhaustion and convergence are not errors: they are reported
//! through [`crate::outcome::TerminationReason`].

use thiserror::Error;

/// Failure of a solver run or of its pre-flight validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// A named option is not part of the configuration surface.
    #[error("unknown option '{name}'")]
    UnknownOption { name: String },

    /// A named option has the wrong type or an unparseable value.
    #[error("option '{name}' has an invalid value: {detail}")]
    InvalidOption { name: String, detail: String },

    /// The model does not provide a bound the algorithm needs.
    #[error("model does not provide a {kind} bound")]
    MissingBound { kind: &'static str },

    /// One-time bound initialization could not produce an admissible bound.
    #[error("bound initialization failed: {detail}")]
    BoundInitialization { detail: String },

    /// A sawtooth domination ratio exceeded 1 by more than round-off.
    #[error("internal consistency error: domination ratio {ratio} exceeds 1")]
    RatioOutOfRange { ratio: f64 },

    /// A node's lower bound rose above its upper bound by more than round-off.
    #[error("internal consistency error: node {node} has lower {lower} above upper {upper}")]
    BoundsCrossed { node: usize, lower: f64, upper: f64 },

    /// The progress sink could not record a snapshot.
    #[error("progress log write failed: {detail}")]
    ProgressLog { detail: String },
}

impl SearchError {
    pub(crate) fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }
}
