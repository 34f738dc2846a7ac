//! [`Model`] implementation for the kernel's tabular POMDP.
//!
//! Outcome indices are observations; for fully observable models the
//! observation is the next state and every belief stays one-hot.

use horizon_kernel::pomdp::TabularPomdp;
use horizon_kernel::vector::SparseVector;

use crate::bounds::planes::MaxPlanesLowerBound;
use crate::bounds::sawtooth::SawtoothUpperBound;
use crate::bounds::{LowerBound, UpperBound};
use crate::config::SolverConfig;
use crate::contract::Model;

impl Model for TabularPomdp {
    fn num_actions(&self) -> usize {
        TabularPomdp::num_actions(self)
    }

    fn discount(&self) -> f64 {
        TabularPomdp::discount(self)
    }

    fn initial_state(&self) -> SparseVector {
        self.initial_belief().clone()
    }

    fn is_terminal_state(&self, state: &SparseVector) -> bool {
        self.is_terminal_belief(state)
    }

    fn outcome_probs(&self, state: &SparseVector, action: usize) -> SparseVector {
        self.observation_probs(state, action)
    }

    fn next_state(&self, state: &SparseVector, action: usize, outcome: usize) -> SparseVector {
        self.belief_update(state, action, outcome)
    }

    fn reward(&self, state: &SparseVector, action: usize) -> f64 {
        self.belief_reward(state, action)
    }

    fn new_lower_bound<'a>(&'a self, config: &SolverConfig) -> Option<Box<dyn LowerBound + 'a>> {
        Some(Box::new(MaxPlanesLowerBound::new(self, config)))
    }

    fn new_upper_bound<'a>(&'a self, config: &SolverConfig) -> Option<Box<dyn UpperBound + 'a>> {
        Some(Box::new(SawtoothUpperBound::new(self, config)))
    }
}
