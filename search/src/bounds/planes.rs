//! Alpha-vector lower bound: `value(b) = max over planes of alpha . b`.

use std::collections::BTreeMap;

use horizon_kernel::pomdp::TabularPomdp;
use horizon_kernel::vector::SparseVector;
use tracing::{debug, info};

use super::init::{blind_planes, worst_case_plane, IterationLimits};
use super::{backup_lower, LowerBound, ValueBound};
use crate::cache::StateGraph;
use crate::config::{LowerBoundInit, SolverConfig};
use crate::error::SearchError;
use crate::node::{argmax, NodeId};

/// A backed-up plane is only kept when it improves the value at its belief
/// by more than this.
pub const PLANE_IMPROVEMENT_TOLERANCE: f64 = 1e-10;

/// Set of alpha vectors over the states of a [`TabularPomdp`].
#[derive(Debug)]
pub struct MaxPlanesLowerBound<'a> {
    model: &'a TabularPomdp,
    init: LowerBoundInit,
    max_iterations: usize,
    prune_growth_factor: f64,
    prune_min_increment: usize,
    planes: Vec<Vec<f64>>,
    next_prune_at: usize,
    initialized: bool,
}

impl<'a> MaxPlanesLowerBound<'a> {
    /// Uninitialized bound; call [`ValueBound::initialize`] before use.
    #[must_use]
    pub fn new(model: &'a TabularPomdp, config: &SolverConfig) -> Self {
        Self {
            model,
            init: config.lower_bound_init,
            max_iterations: config.init_max_iterations,
            prune_growth_factor: config.prune_growth_factor,
            prune_min_increment: config.prune_min_increment,
            planes: Vec::new(),
            next_prune_at: 0,
            initialized: false,
        }
    }

    #[must_use]
    pub fn planes(&self) -> &[Vec<f64>] {
        &self.planes
    }

    /// Index of the plane maximizing `alpha . b` (first on ties).
    fn best_plane(&self, b: &SparseVector) -> Option<usize> {
        argmax(self.planes.iter().map(|alpha| b.dot_dense(alpha)))
    }

    /// Add `plane` if it raises the value at `b`; prunes on the growth
    /// schedule. Returns whether the plane was kept.
    pub fn add_plane(&mut self, plane: Vec<f64>, b: &SparseVector) -> bool {
        let current = self.raw_value(b);
        if b.dot_dense(&plane) <= current + PLANE_IMPROVEMENT_TOLERANCE {
            return false;
        }
        self.planes.push(plane);
        if self.planes.len() >= self.next_prune_at {
            self.prune_dominated();
        }
        true
    }

    /// Drop every plane that is pointwise dominated by another. Returns the
    /// number removed.
    pub fn prune_dominated(&mut self) -> usize {
        let before = self.planes.len();
        let mut kept: Vec<Vec<f64>> = Vec::with_capacity(before);
        for plane in std::mem::take(&mut self.planes) {
            if kept.iter().any(|k| dominates(k, &plane)) {
                continue;
            }
            kept.retain(|k| !dominates(&plane, k));
            kept.push(plane);
        }
        self.planes = kept;
        let len = self.planes.len();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let grown = (len as f64 * self.prune_growth_factor).ceil() as usize;
        self.next_prune_at = grown.max(len + self.prune_min_increment);
        let removed = before - len;
        debug!(removed, remaining = len, "pruned lower bound planes");
        removed
    }

    fn raw_value(&self, b: &SparseVector) -> f64 {
        self.planes
            .iter()
            .map(|alpha| b.dot_dense(alpha))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Point-based backup at node `id`: for every action, combine the best
    /// plane at each successor belief (the best plane at the node's own
    /// belief for outcomes that were never materialized). Returns the best
    /// action, the new plane and its value at the node's belief.
    fn backup_plane(&self, graph: &StateGraph, id: NodeId) -> Option<(usize, Vec<f64>, f64)> {
        let node = graph.node(id);
        let fallback = self.best_plane(&node.state)?;
        let model = self.model;
        let discount = model.discount();
        let mut best: Option<(usize, Vec<f64>, f64)> = None;
        for (action, entry) in node.q.iter().enumerate() {
            let choice: BTreeMap<usize, usize> = entry
                .outcomes
                .iter()
                .filter_map(|e| Some((e.outcome, self.best_plane(&graph.node(e.next).state)?)))
                .collect();
            let mut alpha = vec![0.0; model.num_states()];
            for (s, slot) in alpha.iter_mut().enumerate() {
                if model.is_terminal(s) {
                    continue;
                }
                let mut future = 0.0;
                for (next, t) in model.transition(action).row(s) {
                    for (obs, p) in model.observation_row(action, next) {
                        let k = choice.get(&obs).copied().unwrap_or(fallback);
                        future += t * p * self.planes[k][next];
                    }
                }
                *slot = model.reward(s, action) + discount * future;
            }
            let value = node.state.dot_dense(&alpha);
            if best.as_ref().map_or(true, |(_, _, v)| value > *v) {
                best = Some((action, alpha, value));
            }
        }
        best
    }
}

/// `a >= b` componentwise.
fn dominates(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x >= y)
}

impl ValueBound for MaxPlanesLowerBound<'_> {
    fn initialize(&mut self, target_precision: f64) -> Result<(), SearchError> {
        let limits = IterationLimits::for_precision(target_precision, self.max_iterations);
        self.planes = match self.init {
            LowerBoundInit::WorstCase => vec![worst_case_plane(self.model)?],
            LowerBoundInit::Blind => blind_planes(self.model, limits)?,
        };
        self.prune_dominated();
        self.initialized = true;
        info!(
            init = self.init.as_str(),
            planes = self.planes.len(),
            "alpha-plane lower bound initialized"
        );
        Ok(())
    }

    fn value(&self, state: &SparseVector) -> Result<f64, SearchError> {
        if !self.initialized {
            return Err(SearchError::BoundInitialization {
                detail: "alpha-plane lower bound used before initialize".into(),
            });
        }
        Ok(self.raw_value(state))
    }
}

impl LowerBound for MaxPlanesLowerBound<'_> {
    fn update(&mut self, graph: &mut StateGraph, id: NodeId) -> Result<usize, SearchError> {
        let Some((_, backed)) = backup_lower(graph, id, self.model.discount()) else {
            return Ok(0);
        };
        let planned = self.backup_plane(graph, id);
        let node = graph.node_mut(id);
        let mut value = node.lower.max(backed);
        if let Some((action, _, plane_value)) = &planned {
            let entry = &mut node.q[*action];
            entry.lower = entry.lower.max(*plane_value);
            value = value.max(*plane_value);
        }
        node.lower = value;
        let action = node.best_lower_action().unwrap_or(0);
        if let Some((_, plane, _)) = planned {
            self.add_plane(plane, &graph.node(id).state);
        }
        Ok(action)
    }
}
