//! Typed kernel errors.
//!
//! Kernel errors are raised only while a model is being assembled. Once a
//! [`crate::pomdp::TabularPomdp`] exists, every belief operation on it is
//! infallible.

use thiserror::Error;

/// Failure to assemble a tabular model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("discount {discount} must lie in [0, 1]")]
    InvalidDiscount { discount: f64 },

    #[error("{what} index {index} out of range (bound {bound})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("{what} for action {action}, row {row} sums to {sum} (expected 1)")]
    InvalidDistribution {
        what: &'static str,
        action: usize,
        row: usize,
        sum: f64,
    },

    #[error("{what} probability {value} is negative or not finite")]
    InvalidProbability { what: &'static str, value: f64 },

    #[error("{what}: expected dimension {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("initial belief sums to {sum} (expected 1)")]
    InvalidInitialBelief { sum: f64 },

    #[error("model has no actions")]
    NoActions,
}
