//! The classic tiger problem.
//!
//! A tiger hides behind the left or right door. Listening costs 1 and hears
//! the correct side with probability 0.85. Opening the tiger's door costs
//! 100, the other door pays 10, and either opening resets the problem with
//! the tiger placed uniformly at random.

use horizon_kernel::error::KernelError;
use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};
use horizon_kernel::vector::SparseVector;

pub const TIGER_LEFT: usize = 0;
pub const TIGER_RIGHT: usize = 1;

pub const LISTEN: usize = 0;
pub const OPEN_LEFT: usize = 1;
pub const OPEN_RIGHT: usize = 2;

pub const HEAR_LEFT: usize = 0;
pub const HEAR_RIGHT: usize = 1;

pub const DISCOUNT: f64 = 0.95;
pub const LISTEN_ACCURACY: f64 = 0.85;

/// # Errors
///
/// Never in practice; propagated from the model builder.
pub fn model() -> Result<TabularPomdp, KernelError> {
    let mut builder = PomdpBuilder::new(2, 3, 2).discount(DISCOUNT);
    for s in [TIGER_LEFT, TIGER_RIGHT] {
        builder = builder.transition(s, LISTEN, s, 1.0).reward(s, LISTEN, -1.0);
        for open in [OPEN_LEFT, OPEN_RIGHT] {
            builder = builder
                .transition(s, open, TIGER_LEFT, 0.5)
                .transition(s, open, TIGER_RIGHT, 0.5);
        }
    }
    builder = builder
        .reward(TIGER_LEFT, OPEN_LEFT, -100.0)
        .reward(TIGER_LEFT, OPEN_RIGHT, 10.0)
        .reward(TIGER_RIGHT, OPEN_LEFT, 10.0)
        .reward(TIGER_RIGHT, OPEN_RIGHT, -100.0);
    for (s, heard) in [(TIGER_LEFT, HEAR_LEFT), (TIGER_RIGHT, HEAR_RIGHT)] {
        builder = builder
            .observation(LISTEN, s, heard, LISTEN_ACCURACY)
            .observation(LISTEN, s, 1 - heard, 1.0 - LISTEN_ACCURACY);
        for open in [OPEN_LEFT, OPEN_RIGHT] {
            builder = builder
                .observation(open, s, HEAR_LEFT, 0.5)
                .observation(open, s, HEAR_RIGHT, 0.5);
        }
    }
    builder
        .initial_belief(SparseVector::from_dense(&[0.5, 0.5]))
        .build()
}
