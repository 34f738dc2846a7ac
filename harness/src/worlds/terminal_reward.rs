//! Two states, one action: state 0 pays 5 and moves to the terminal state 1.
//! Undiscounted.

use horizon_kernel::error::KernelError;
use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};

/// Optimal value at the initial state.
pub const OPTIMAL_VALUE: f64 = 5.0;

/// # Errors
///
/// Never in practice; propagated from the model builder.
pub fn model() -> Result<TabularPomdp, KernelError> {
    PomdpBuilder::mdp(2, 1)
        .discount(1.0)
        .transition(0, 0, 1, 1.0)
        .reward(0, 0, OPTIMAL_VALUE)
        .terminal(1)
        .initial_state(0)
        .build()
}
