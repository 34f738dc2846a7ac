//! A corridor of cells with the goal at the right end. Moves succeed with
//! probability 0.8 and otherwise leave the agent in place; each step costs 1.

use horizon_kernel::error::KernelError;
use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};

pub const LENGTH: usize = 6;
pub const DISCOUNT: f64 = 0.95;
pub const SUCCESS: f64 = 0.8;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// Index of the terminal goal cell.
#[must_use]
pub fn goal() -> usize {
    LENGTH - 1
}

/// # Errors
///
/// Never in practice; propagated from the model builder.
pub fn model() -> Result<TabularPomdp, KernelError> {
    let mut builder = PomdpBuilder::mdp(LENGTH, 2).discount(DISCOUNT);
    for cell in 0..goal() {
        let left = cell.saturating_sub(1);
        let right = cell + 1;
        builder = builder
            .transition(cell, RIGHT, right, SUCCESS)
            .transition(cell, RIGHT, cell, 1.0 - SUCCESS)
            .reward(cell, RIGHT, -1.0)
            .reward(cell, LEFT, -1.0);
        builder = if left == cell {
            builder.transition(cell, LEFT, cell, 1.0)
        } else {
            builder
                .transition(cell, LEFT, left, SUCCESS)
                .transition(cell, LEFT, cell, 1.0 - SUCCESS)
        };
    }
    builder.terminal(goal()).initial_state(0).build()
}
