//! Three states on a ring, discount 0.9. Action 0 advances around the ring,
//! action 1 stays put; every step costs 1, so every policy is worth -10.

use horizon_kernel::error::KernelError;
use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};

pub const DISCOUNT: f64 = 0.9;

/// `-1 / (1 - 0.9)`.
pub const OPTIMAL_VALUE: f64 = -10.0;

/// # Errors
///
/// Never in practice; propagated from the model builder.
pub fn model() -> Result<TabularPomdp, KernelError> {
    let mut builder = PomdpBuilder::mdp(3, 2).discount(DISCOUNT);
    for s in 0..3 {
        builder = builder
            .transition(s, 0, (s + 1) % 3, 1.0)
            .transition(s, 1, s, 1.0)
            .reward(s, 0, -1.0)
            .reward(s, 1, -1.0);
    }
    builder.initial_state(0).build()
}
