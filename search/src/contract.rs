//! Decision process contract consumed by the search core.

use horizon_kernel::vector::SparseVector;

use crate::bounds::{LowerBound, UpperBound};
use crate::config::SolverConfig;

/// A decision process the search can plan over.
///
/// States are [`SparseVector`]s: one-hot vectors for fully observable models,
/// beliefs for POMDPs. The core never validates what the model returns.
///
/// # Contract
///
/// - `outcome_probs` is a distribution over outcome indices; the caller
///   drops entries at or below [`crate::node::OUTCOME_PROB_EPS`].
/// - `next_state` is only asked for outcomes with positive probability.
/// - Every method is deterministic: same inputs, same outputs.
/// - Either bound factory may return `None` when the model cannot supply
///   that bound.
pub trait Model {
    fn num_actions(&self) -> usize;

    /// Discount factor in `[0, 1]`.
    fn discount(&self) -> f64;

    fn initial_state(&self) -> SparseVector;

    fn is_terminal_state(&self, state: &SparseVector) -> bool;

    fn outcome_probs(&self, state: &SparseVector, action: usize) -> SparseVector;

    fn next_state(&self, state: &SparseVector, action: usize, outcome: usize) -> SparseVector;

    /// Expected immediate reward.
    fn reward(&self, state: &SparseVector, action: usize) -> f64;

    /// Fresh, uninitialized lower bound for this model.
    fn new_lower_bound<'a>(&'a self, config: &SolverConfig) -> Option<Box<dyn LowerBound + 'a>>;

    /// Fresh, uninitialized upper bound for this model.
    fn new_upper_bound<'a>(&'a self, config: &SolverConfig) -> Option<Box<dyn UpperBound + 'a>>;
}
