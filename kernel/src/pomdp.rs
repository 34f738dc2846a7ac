//! Tabular POMDP model and its belief operations.
//!
//! A fully observable MDP is the special case where the observation after
//! each step is the next state itself; its beliefs are always one-hot, so the
//! same belief-space machinery serves both.
//!
//! Terminal states are absorbing and reward-free: the builder overwrites
//! their transition rows with a self-loop and their rewards with zero for
//! every action.

use crate::error::KernelError;
use crate::matrix::SparseMatrix;
use crate::vector::SparseVector;

/// Tolerance on probability row sums checked at build time.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// How observations are generated after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationModel {
    /// The observation index equals the next state index.
    FullyObservable,
    /// One `O_a[s'][o]` matrix per action.
    Matrices(Vec<SparseMatrix>),
}

/// Flat POMDP: `T_a[s][s']`, `O_a[s'][o]`, `R[s][a]`, terminal set, initial belief.
#[derive(Debug, Clone)]
pub struct TabularPomdp {
    num_states: usize,
    num_actions: usize,
    num_observations: usize,
    discount: f64,
    transitions: Vec<SparseMatrix>,
    observations: ObservationModel,
    rewards: Vec<f64>,
    terminal: Vec<bool>,
    initial_belief: SparseVector,
}

impl TabularPomdp {
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    #[must_use]
    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    #[must_use]
    pub fn discount(&self) -> f64 {
        self.discount
    }

    #[must_use]
    pub fn initial_belief(&self) -> &SparseVector {
        &self.initial_belief
    }

    #[must_use]
    pub fn is_fully_observable(&self) -> bool {
        matches!(self.observations, ObservationModel::FullyObservable)
    }

    /// Transition matrix `T_a` (rows: current state, cols: next state).
    #[must_use]
    pub fn transition(&self, action: usize) -> &SparseMatrix {
        &self.transitions[action]
    }

    /// Observation matrix `O_a` (rows: next state, cols: observation), or
    /// `None` for fully observable models.
    #[must_use]
    pub fn observation(&self, action: usize) -> Option<&SparseMatrix> {
        match &self.observations {
            ObservationModel::FullyObservable => None,
            ObservationModel::Matrices(m) => Some(&m[action]),
        }
    }

    /// `O(a, s', o)`.
    #[must_use]
    pub fn observation_prob(&self, action: usize, next_state: usize, obs: usize) -> f64 {
        match &self.observations {
            ObservationModel::FullyObservable => {
                if next_state == obs {
                    1.0
                } else {
                    0.0
                }
            }
            ObservationModel::Matrices(m) => m[action].get(next_state, obs),
        }
    }

    /// Nonzero `(o, O(a, s', o))` pairs for a next state.
    #[must_use]
    pub fn observation_row(&self, action: usize, next_state: usize) -> Vec<(usize, f64)> {
        match &self.observations {
            ObservationModel::FullyObservable => vec![(next_state, 1.0)],
            ObservationModel::Matrices(m) => m[action].row(next_state).collect(),
        }
    }

    /// `R(s, a)`.
    #[must_use]
    pub fn reward(&self, state: usize, action: usize) -> f64 {
        self.rewards[state * self.num_actions + action]
    }

    /// Dense reward column `R(., a)`.
    #[must_use]
    pub fn reward_vector(&self, action: usize) -> Vec<f64> {
        (0..self.num_states).map(|s| self.reward(s, action)).collect()
    }

    #[must_use]
    pub fn is_terminal(&self, state: usize) -> bool {
        self.terminal[state]
    }

    /// Smallest reward over non-terminal states and all actions
    /// (zero when every state is terminal).
    #[must_use]
    pub fn min_reward(&self) -> f64 {
        self.reward_extreme(f64::min, f64::INFINITY)
    }

    /// Largest reward over non-terminal states and all actions
    /// (zero when every state is terminal).
    #[must_use]
    pub fn max_reward(&self) -> f64 {
        self.reward_extreme(f64::max, f64::NEG_INFINITY)
    }

    fn reward_extreme(&self, pick: fn(f64, f64) -> f64, init: f64) -> f64 {
        let value = (0..self.num_states)
            .filter(|&s| !self.terminal[s])
            .flat_map(|s| (0..self.num_actions).map(move |a| (s, a)))
            .fold(init, |acc, (s, a)| pick(acc, self.reward(s, a)));
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Expected immediate reward of `action` under belief `b`.
    #[must_use]
    pub fn belief_reward(&self, belief: &SparseVector, action: usize) -> f64 {
        belief.iter().map(|(s, p)| p * self.reward(s, action)).sum()
    }

    /// A belief is terminal when all of its support is terminal.
    #[must_use]
    pub fn is_terminal_belief(&self, belief: &SparseVector) -> bool {
        belief.support().all(|s| self.terminal[s])
    }

    /// Predicted next-state distribution `T_a^T b` (dense).
    #[must_use]
    pub fn predict(&self, belief: &SparseVector, action: usize) -> Vec<f64> {
        self.transitions[action].transpose_mul(belief)
    }

    /// Distribution over observation indices after taking `action` in `b`.
    #[must_use]
    pub fn observation_probs(&self, belief: &SparseVector, action: usize) -> SparseVector {
        let predicted = self.predict(belief, action);
        match &self.observations {
            ObservationModel::FullyObservable => SparseVector::from_dense(&predicted),
            ObservationModel::Matrices(m) => {
                let dense = m[action].transpose_mul(&SparseVector::from_dense(&predicted));
                SparseVector::from_dense(&dense)
            }
        }
    }

    /// Bayesian belief update `b' ~ O_a(., o) * T_a^T b`.
    ///
    /// The caller only asks for observations with positive probability; if
    /// the observation is impossible the unconditioned prediction is returned.
    #[must_use]
    pub fn belief_update(&self, belief: &SparseVector, action: usize, obs: usize) -> SparseVector {
        match &self.observations {
            ObservationModel::FullyObservable => SparseVector::unit(self.num_states, obs),
            ObservationModel::Matrices(m) => {
                let predicted = self.predict(belief, action);
                let weighted = SparseVector::from_entries(
                    self.num_states,
                    predicted
                        .iter()
                        .enumerate()
                        .filter(|&(_, &p)| p != 0.0)
                        .map(|(s, &p)| (s, p * m[action].get(s, obs))),
                );
                weighted.normalized().unwrap_or_else(|| {
                    let fallback = SparseVector::from_dense(&predicted);
                    fallback.normalized().unwrap_or(fallback)
                })
            }
        }
    }
}

/// Incremental builder for [`TabularPomdp`].
#[derive(Debug, Clone)]
pub struct PomdpBuilder {
    num_states: usize,
    num_actions: usize,
    num_observations: usize,
    discount: f64,
    transitions: Vec<(usize, usize, usize, f64)>,
    observations: Vec<(usize, usize, usize, f64)>,
    fully_observable: bool,
    rewards: Vec<(usize, usize, f64)>,
    terminal: Vec<usize>,
    initial_belief: Option<SparseVector>,
}

impl PomdpBuilder {
    /// A partially observable model.
    #[must_use]
    pub fn new(num_states: usize, num_actions: usize, num_observations: usize) -> Self {
        Self {
            num_states,
            num_actions,
            num_observations,
            discount: 1.0,
            transitions: Vec::new(),
            observations: Vec::new(),
            fully_observable: false,
            rewards: Vec::new(),
            terminal: Vec::new(),
            initial_belief: None,
        }
    }

    /// A fully observable model (observation = next state).
    #[must_use]
    pub fn mdp(num_states: usize, num_actions: usize) -> Self {
        Self {
            fully_observable: true,
            ..Self::new(num_states, num_actions, num_states)
        }
    }

    #[must_use]
    pub fn discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Add `T(s, a, s') += p`.
    #[must_use]
    pub fn transition(mut self, state: usize, action: usize, next: usize, p: f64) -> Self {
        self.transitions.push((action, state, next, p));
        self
    }

    /// Add `O(a, s', o) += p`. Ignored for fully observable models.
    #[must_use]
    pub fn observation(mut self, action: usize, next: usize, obs: usize, p: f64) -> Self {
        self.observations.push((action, next, obs, p));
        self
    }

    /// Set `R(s, a)`.
    #[must_use]
    pub fn reward(mut self, state: usize, action: usize, r: f64) -> Self {
        self.rewards.push((state, action, r));
        self
    }

    /// Mark a state terminal (absorbing, zero reward).
    #[must_use]
    pub fn terminal(mut self, state: usize) -> Self {
        self.terminal.push(state);
        self
    }

    #[must_use]
    pub fn initial_belief(mut self, belief: SparseVector) -> Self {
        self.initial_belief = Some(belief);
        self
    }

    /// Start with certainty in `state`.
    #[must_use]
    pub fn initial_state(self, state: usize) -> Self {
        let dim = self.num_states;
        self.initial_belief(SparseVector::from_entries(dim, [(state, 1.0)]))
    }

    /// Validate and assemble the model.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] on out-of-range indices, a discount outside
    /// `[0, 1]`, invalid probabilities, distributions that do not sum to one,
    /// or an initial belief of the wrong dimension or mass.
    pub fn build(self) -> Result<TabularPomdp, KernelError> {
        let (n, na, no) = (self.num_states, self.num_actions, self.num_observations);
        if na == 0 {
            return Err(KernelError::NoActions);
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(KernelError::InvalidDiscount {
                discount: self.discount,
            });
        }
        if self.fully_observable && no != n {
            return Err(KernelError::DimensionMismatch {
                what: "fully observable observation count",
                expected: n,
                actual: no,
            });
        }

        let mut terminal = vec![false; n];
        for &s in &self.terminal {
            check_index("terminal state", s, n)?;
            terminal[s] = true;
        }

        let mut trans: Vec<Vec<(usize, usize, f64)>> = vec![Vec::new(); na];
        for &(a, s, s2, p) in &self.transitions {
            check_index("action", a, na)?;
            check_index("state", s, n)?;
            check_index("next state", s2, n)?;
            check_probability("transition", p)?;
            if !terminal[s] {
                trans[a].push((s, s2, p));
            }
        }
        for (s, _) in terminal.iter().enumerate().filter(|&(_, &t)| t) {
            for row in &mut trans {
                row.push((s, s, 1.0));
            }
        }
        let transitions: Vec<SparseMatrix> = trans
            .iter()
            .map(|t| SparseMatrix::from_triplets(n, n, t))
            .collect();
        for (a, m) in transitions.iter().enumerate() {
            check_rows("transition", a, m)?;
        }

        let observations = if self.fully_observable {
            ObservationModel::FullyObservable
        } else {
            let mut obs: Vec<Vec<(usize, usize, f64)>> = vec![Vec::new(); na];
            for &(a, s2, o, p) in &self.observations {
                check_index("action", a, na)?;
                check_index("next state", s2, n)?;
                check_index("observation", o, no)?;
                check_probability("observation", p)?;
                obs[a].push((s2, o, p));
            }
            let mut matrices = Vec::with_capacity(na);
            for (a, triplets) in obs.iter_mut().enumerate() {
                // Terminal states without an observation row emit observation 0.
                for (s2, _) in terminal.iter().enumerate().filter(|&(_, &t)| t) {
                    if !triplets.iter().any(|&(r, _, _)| r == s2) {
                        triplets.push((s2, 0, 1.0));
                    }
                }
                let m = SparseMatrix::from_triplets(n, no, triplets);
                check_rows("observation", a, &m)?;
                matrices.push(m);
            }
            ObservationModel::Matrices(matrices)
        };

        let mut rewards = vec![0.0; n * na];
        for &(s, a, r) in &self.rewards {
            check_index("state", s, n)?;
            check_index("action", a, na)?;
            if !terminal[s] {
                rewards[s * na + a] = r;
            }
        }

        let initial_belief = self
            .initial_belief
            .unwrap_or_else(|| SparseVector::from_entries(n, [(0, 1.0)]));
        if initial_belief.dim() != n {
            return Err(KernelError::DimensionMismatch {
                what: "initial belief",
                expected: n,
                actual: initial_belief.dim(),
            });
        }
        let mass = initial_belief.sum();
        if (mass - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(KernelError::InvalidInitialBelief { sum: mass });
        }

        Ok(TabularPomdp {
            num_states: n,
            num_actions: na,
            num_observations: no,
            discount: self.discount,
            transitions,
            observations,
            rewards,
            terminal,
            initial_belief,
        })
    }
}

fn check_index(what: &'static str, index: usize, bound: usize) -> Result<(), KernelError> {
    if index < bound {
        Ok(())
    } else {
        Err(KernelError::IndexOutOfRange { what, index, bound })
    }
}

fn check_probability(what: &'static str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidProbability { what, value })
    }
}

fn check_rows(what: &'static str, action: usize, m: &SparseMatrix) -> Result<(), KernelError> {
    for row in 0..m.rows() {
        let sum = m.row_sum(row);
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(KernelError::InvalidDistribution {
                what,
                action,
                row,
                sum,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two hidden states, one "listen" action with 0.85 accurate observations.
    fn listening_model() -> TabularPomdp {
        PomdpBuilder::new(2, 1, 2)
            .discount(0.95)
            .transition(0, 0, 0, 1.0)
            .transition(1, 0, 1, 1.0)
            .observation(0, 0, 0, 0.85)
            .observation(0, 0, 1, 0.15)
            .observation(0, 1, 0, 0.15)
            .observation(0, 1, 1, 0.85)
            .reward(0, 0, -1.0)
            .reward(1, 0, -1.0)
            .initial_belief(SparseVector::from_dense(&[0.5, 0.5]))
            .build()
            .unwrap()
    }

    #[test]
    fn observation_probs_and_update() {
        let m = listening_model();
        let b = m.initial_belief().clone();
        let probs = m.observation_probs(&b, 0);
        assert!((probs.get(0) - 0.5).abs() < 1e-12);
        let next = m.belief_update(&b, 0, 0);
        assert!((next.get(0) - 0.85).abs() < 1e-12);
        assert!((next.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn terminal_states_are_absorbing_and_reward_free() {
        let m = PomdpBuilder::mdp(2, 1)
            .transition(0, 0, 1, 1.0)
            .transition(1, 0, 0, 1.0)
            .reward(0, 0, 5.0)
            .reward(1, 0, 7.0)
            .terminal(1)
            .build()
            .unwrap();
        assert!((m.transition(0).get(1, 1) - 1.0).abs() < 1e-12);
        assert_eq!(m.transition(0).get(1, 0), 0.0);
        assert_eq!(m.reward(1, 0), 0.0);
        assert!((m.max_reward() - 5.0).abs() < 1e-12);
        assert!(m.is_terminal_belief(&SparseVector::unit(2, 1)));
        assert!(!m.is_terminal_belief(&SparseVector::unit(2, 0)));
    }

    #[test]
    fn fully_observable_update_is_one_hot() {
        let m = PomdpBuilder::mdp(3, 1)
            .discount(0.9)
            .transition(0, 0, 1, 0.5)
            .transition(0, 0, 2, 0.5)
            .transition(1, 0, 1, 1.0)
            .transition(2, 0, 2, 1.0)
            .build()
            .unwrap();
        let b = m.initial_belief().clone();
        let probs = m.observation_probs(&b, 0);
        assert_eq!(probs.entries(), &[(1, 0.5), (2, 0.5)]);
        assert_eq!(m.belief_update(&b, 0, 2), SparseVector::unit(3, 2));
    }

    #[test]
    fn bad_distribution_is_rejected() {
        let err = PomdpBuilder::mdp(2, 1)
            .transition(0, 0, 1, 0.7)
            .transition(1, 0, 1, 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::InvalidDistribution { what: "transition", row: 0, .. }
        ));
    }

    #[test]
    fn bad_discount_is_rejected() {
        let err = PomdpBuilder::mdp(1, 1)
            .discount(1.5)
            .transition(0, 0, 0, 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidDiscount { .. }));
    }
}
