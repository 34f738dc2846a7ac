//! One-time initializers for the value bounds.
//!
//! Every routine works on dense state-indexed vectors of a
//! [`TabularPomdp`]. Terminal entries are always 0.
//!
//! Discounted models iterate from an admissible start, so every iterate is
//! itself admissible and hitting the iteration cap is not an error.
//! Undiscounted models have no admissible constant start: their iterations
//! start at 0 and only a converged fixed point is accepted.

use horizon_kernel::pomdp::TabularPomdp;
use horizon_kernel::vector::max_abs_diff;
use tracing::debug;

use crate::error::SearchError;

/// Iterations stop once the largest change falls below
/// `target_precision * INIT_TOLERANCE_FACTOR`.
pub const INIT_TOLERANCE_FACTOR: f64 = 1e-3;

/// Iteration limits shared by the initializers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationLimits {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl IterationLimits {
    #[must_use]
    pub fn for_precision(target_precision: f64, max_iterations: usize) -> Self {
        Self {
            tolerance: target_precision * INIT_TOLERANCE_FACTOR,
            max_iterations,
        }
    }
}

fn is_discounted(model: &TabularPomdp) -> bool {
    model.discount() < 1.0
}

fn constant_vector(model: &TabularPomdp, value: f64) -> Vec<f64> {
    (0..model.num_states())
        .map(|s| if model.is_terminal(s) { 0.0 } else { value })
        .collect()
}

/// `R(., a) + discount * T_a v`, with terminal entries pinned at 0.
#[must_use]
pub fn action_backup(model: &TabularPomdp, action: usize, values: &[f64]) -> Vec<f64> {
    let discount = model.discount();
    let expected = model.transition(action).mul_dense(values);
    (0..model.num_states())
        .map(|s| {
            if model.is_terminal(s) {
                0.0
            } else {
                model.reward(s, action) + discount * expected[s]
            }
        })
        .collect()
}

/// Per-action `Q` vectors of a state value function.
#[must_use]
pub fn q_vectors(model: &TabularPomdp, values: &[f64]) -> Vec<Vec<f64>> {
    (0..model.num_actions())
        .map(|a| action_backup(model, a, values))
        .collect()
}

/// Pointwise maximum over a non-empty set of vectors.
#[must_use]
pub fn upper_envelope(vectors: &[Vec<f64>], dim: usize) -> Vec<f64> {
    (0..dim)
        .map(|s| {
            vectors
                .iter()
                .map(|v| v[s])
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect()
}

/// `max(maxReward, 0) / (1 - discount)` at every non-terminal state.
///
/// # Errors
///
/// Undiscounted models have no finite envelope.
pub fn max_reward_envelope(model: &TabularPomdp) -> Result<Vec<f64>, SearchError> {
    if !is_discounted(model) {
        return Err(SearchError::BoundInitialization {
            detail: "the maxReward upper envelope requires discount < 1".into(),
        });
    }
    let value = model.max_reward().max(0.0) / (1.0 - model.discount());
    Ok(constant_vector(model, value))
}

/// `min(minReward, 0) / (1 - discount)` at every non-terminal state.
///
/// # Errors
///
/// Undiscounted models have no finite worst case.
pub fn worst_case_plane(model: &TabularPomdp) -> Result<Vec<f64>, SearchError> {
    if !is_discounted(model) {
        return Err(SearchError::BoundInitialization {
            detail: "the worst-case lower plane requires discount < 1".into(),
        });
    }
    let value = model.min_reward().min(0.0) / (1.0 - model.discount());
    Ok(constant_vector(model, value))
}

/// Value iteration on the fully observable relaxation.
///
/// # Errors
///
/// An undiscounted model that does not converge within the limits.
pub fn relaxed_mdp_values(
    model: &TabularPomdp,
    limits: IterationLimits,
) -> Result<Vec<f64>, SearchError> {
    let mut values = if is_discounted(model) {
        max_reward_envelope(model)?
    } else {
        vec![0.0; model.num_states()]
    };
    for iteration in 0..limits.max_iterations {
        let next = upper_envelope(&q_vectors(model, &values), model.num_states());
        let residual = max_abs_diff(&next, &values);
        values = next;
        if residual < limits.tolerance {
            debug!(iteration, residual, "relaxed MDP value iteration converged");
            return Ok(values);
        }
    }
    if is_discounted(model) {
        debug!(
            max_iterations = limits.max_iterations,
            "relaxed MDP value iteration stopped at the iteration cap"
        );
        Ok(values)
    } else {
        Err(SearchError::BoundInitialization {
            detail: format!(
                "relaxed MDP value iteration did not converge within {} iterations",
                limits.max_iterations
            ),
        })
    }
}

/// One sweep of the fast informed bound operator over per-action vectors.
fn fib_sweep(model: &TabularPomdp, alphas: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let discount = model.discount();
    let num_actions = model.num_actions();
    let num_obs = model.num_observations();
    let mut out = Vec::with_capacity(num_actions);
    let mut acc = vec![0.0; num_obs * num_actions];
    for action in 0..num_actions {
        let mut alpha = vec![0.0; model.num_states()];
        for (s, slot) in alpha.iter_mut().enumerate() {
            if model.is_terminal(s) {
                continue;
            }
            acc.iter_mut().for_each(|x| *x = 0.0);
            for (next, t) in model.transition(action).row(s) {
                for (obs, p) in model.observation_row(action, next) {
                    let w = t * p;
                    for (a2, plane) in alphas.iter().enumerate() {
                        acc[obs * num_actions + a2] += w * plane[next];
                    }
                }
            }
            let lookahead: f64 = acc
                .chunks(num_actions)
                .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
                .filter(|v| v.is_finite())
                .sum();
            *slot = model.reward(s, action) + discount * lookahead;
        }
        out.push(alpha);
    }
    out
}

/// Fast informed bound vectors, one per action, refined from the relaxed
/// MDP `Q` vectors until the sweep residual falls below the tolerance.
///
/// # Errors
///
/// Propagates [`relaxed_mdp_values`] failures.
pub fn fast_informed_bound(
    model: &TabularPomdp,
    limits: IterationLimits,
) -> Result<Vec<Vec<f64>>, SearchError> {
    let values = relaxed_mdp_values(model, limits)?;
    let mut alphas = q_vectors(model, &values);
    for iteration in 0..limits.max_iterations {
        let next = fib_sweep(model, &alphas);
        let residual = next
            .iter()
            .zip(&alphas)
            .map(|(a, b)| max_abs_diff(a, b))
            .fold(0.0, f64::max);
        alphas = next;
        if residual < limits.tolerance {
            debug!(iteration, residual, "fast informed bound converged");
            break;
        }
    }
    Ok(alphas)
}

/// Value of always taking `action`, as an alpha vector.
///
/// Discounted models start at the worst-case plane and any iterate is kept;
/// undiscounted models return `None` unless the iteration converges.
///
/// # Errors
///
/// Propagates [`worst_case_plane`] failures.
pub fn fixed_action_plane(
    model: &TabularPomdp,
    action: usize,
    limits: IterationLimits,
) -> Result<Option<Vec<f64>>, SearchError> {
    let discounted = is_discounted(model);
    let mut plane = if discounted {
        worst_case_plane(model)?
    } else {
        vec![0.0; model.num_states()]
    };
    for _ in 0..limits.max_iterations {
        let next = action_backup(model, action, &plane);
        let residual = max_abs_diff(&next, &plane);
        plane = next;
        if !residual.is_finite() {
            return Ok(None);
        }
        if residual < limits.tolerance {
            return Ok(Some(plane));
        }
    }
    Ok(discounted.then_some(plane))
}

/// Worst-case plane (discounted models only) plus one plane per action.
///
/// # Errors
///
/// An undiscounted model where no fixed-action iteration converges.
pub fn blind_planes(
    model: &TabularPomdp,
    limits: IterationLimits,
) -> Result<Vec<Vec<f64>>, SearchError> {
    let mut planes = Vec::new();
    if is_discounted(model) {
        planes.push(worst_case_plane(model)?);
    }
    for action in 0..model.num_actions() {
        match fixed_action_plane(model, action, limits)? {
            Some(plane) => planes.push(plane),
            None => debug!(action, "fixed-action plane did not converge; dropped"),
        }
    }
    if planes.is_empty() {
        return Err(SearchError::BoundInitialization {
            detail: "no fixed-action plane converged for an undiscounted model".into(),
        });
    }
    Ok(planes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_kernel::pomdp::PomdpBuilder;
    use horizon_kernel::vector::SparseVector;

    fn limits() -> IterationLimits {
        IterationLimits::for_precision(1e-3, 100_000)
    }

    fn self_loop(discount: f64) -> TabularPomdp {
        PomdpBuilder::mdp(1, 1)
            .discount(discount)
            .transition(0, 0, 0, 1.0)
            .reward(0, 0, -1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn envelopes_for_discounted_self_loop() {
        let model = self_loop(0.9);
        assert_eq!(max_reward_envelope(&model).unwrap(), vec![0.0]);
        assert!((worst_case_plane(&model).unwrap()[0] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn undiscounted_envelopes_are_rejected() {
        let model = self_loop(1.0);
        assert!(matches!(
            max_reward_envelope(&model),
            Err(SearchError::BoundInitialization { .. })
        ));
        assert!(worst_case_plane(&model).is_err());
        // Never terminates: no plane converges.
        assert!(blind_planes(&model, limits()).is_err());
    }

    #[test]
    fn relaxed_values_stay_above_and_near_optimum() {
        let model = self_loop(0.9);
        let v = relaxed_mdp_values(&model, limits()).unwrap();
        assert!(v[0] >= -10.0);
        assert!(v[0] < -9.99);
    }

    #[test]
    fn undiscounted_terminal_chain_converges_exactly() {
        let model = PomdpBuilder::mdp(2, 1)
            .transition(0, 0, 1, 1.0)
            .reward(0, 0, 5.0)
            .terminal(1)
            .build()
            .unwrap();
        assert_eq!(relaxed_mdp_values(&model, limits()).unwrap(), vec![5.0, 0.0]);
        assert_eq!(blind_planes(&model, limits()).unwrap(), vec![vec![5.0, 0.0]]);
    }

    #[test]
    fn fib_is_tighter_than_qmdp_under_partial_observability() {
        // Two hidden states; guessing right pays 1, wrong pays 0, and the
        // only observation is uninformative.
        let model = PomdpBuilder::new(3, 2, 1)
            .discount(0.5)
            .transition(0, 0, 2, 1.0)
            .transition(0, 1, 2, 1.0)
            .transition(1, 0, 2, 1.0)
            .transition(1, 1, 2, 1.0)
            .observation(0, 0, 0, 1.0)
            .observation(0, 1, 0, 1.0)
            .observation(0, 2, 0, 1.0)
            .observation(1, 0, 0, 1.0)
            .observation(1, 1, 0, 1.0)
            .observation(1, 2, 0, 1.0)
            .reward(0, 0, 1.0)
            .reward(1, 1, 1.0)
            .terminal(2)
            .initial_belief(SparseVector::from_dense(&[0.5, 0.5, 0.0]))
            .build()
            .unwrap();
        let fib = fast_informed_bound(&model, limits()).unwrap();
        let b = [0.5, 0.5, 0.0];
        let value = fib
            .iter()
            .map(|alpha| alpha.iter().zip(&b).map(|(x, y)| x * y).sum::<f64>())
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((value - 0.5).abs() < 1e-9);
    }
}
