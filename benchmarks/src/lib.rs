//! Shared helpers for horizon benchmark suites.

use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};
use horizon_kernel::vector::SparseVector;

/// A ring of `n` hidden states with noisy position sensing: stepping moves
/// clockwise with probability 0.9, and the sensor reports the true position
/// with probability 0.7 and a neighbour otherwise. Reward 1 at state 0.
///
/// # Panics
///
/// Panics if `n < 3`. Benchmark setup failures are fatal.
#[must_use]
pub fn noisy_ring(n: usize) -> TabularPomdp {
    assert!(n >= 3, "noisy_ring needs at least 3 states");
    let mut builder = PomdpBuilder::new(n, 2, n).discount(0.95);
    for s in 0..n {
        let next = (s + 1) % n;
        let prev = (s + n - 1) % n;
        builder = builder
            .transition(s, 0, next, 0.9)
            .transition(s, 0, s, 0.1)
            .transition(s, 1, s, 1.0);
        for a in 0..2 {
            builder = builder
                .observation(a, s, s, 0.7)
                .observation(a, s, next, 0.15)
                .observation(a, s, prev, 0.15);
        }
    }
    builder = builder.reward(0, 0, 1.0).reward(0, 1, 1.0);
    #[allow(clippy::cast_precision_loss)]
    let uniform = vec![1.0 / n as f64; n];
    builder
        .initial_belief(SparseVector::from_dense(&uniform))
        .build()
        .expect("noisy_ring builds")
}

/// `count` distinct interior beliefs over `n` states.
#[must_use]
pub fn interior_beliefs(n: usize, count: usize) -> Vec<SparseVector> {
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let weights: Vec<f64> = (0..n)
                .map(|s| 1.0 + ((s * 7 + i * 13 + s * s * i) % 101) as f64)
                .collect();
            let total: f64 = weights.iter().sum();
            let dense: Vec<f64> = weights.iter().map(|w| w / total).collect();
            SparseVector::from_dense(&dense)
        })
        .collect()
}
