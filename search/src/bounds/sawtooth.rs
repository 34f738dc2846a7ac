//! Sawtooth point-set upper bound.
//!
//! The bound is a corner vector (the envelope at every basis state) plus a
//! set of interior witness points, each of which dents the envelope:
//!
//! ```text
//! value(b) = min( b.corner,  min_c  b.corner + ratio(b, c) * (c.value - c.corner) )
//! ```
//!
//! where `ratio(b, c)` is the largest `t <= 1` with `t * c <= b`
//! componentwise. Corner points are folded into the corner vector instead
//! of being stored. An inverted index from dimension to witness keeps both
//! lookups and pruning restricted to witnesses that share support.
//!
//! When seeded by the fast informed bound, its per-action vectors are kept
//! too and `value` is the minimum of both envelopes.

use std::collections::{BTreeMap, BTreeSet};

use horizon_kernel::pomdp::TabularPomdp;
use horizon_kernel::vector::{dense_dot, SparseVector};
use tracing::{debug, info};

use super::init::{
    fast_informed_bound, max_reward_envelope, relaxed_mdp_values, upper_envelope,
    IterationLimits,
};
use super::{backup_upper, UpperBound, ValueBound};
use crate::cache::StateGraph;
use crate::config::{SolverConfig, UpperBoundInit};
use crate::error::SearchError;
use crate::node::NodeId;

/// A domination ratio may exceed 1 by this much before it is an error.
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// Slack used when deciding that a witness adds nothing.
pub const DOMINATION_TOLERANCE: f64 = 1e-10;

/// Interior witness point.
#[derive(Debug, Clone, PartialEq)]
pub struct BvPair {
    id: u64,
    state: SparseVector,
    value: f64,
    /// `state . corner`, kept current as corner entries move.
    inner_corner_value: f64,
    /// Update clock at insertion.
    created_at: u64,
}

impl BvPair {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> &SparseVector {
        &self.state
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn inner_corner_value(&self) -> f64 {
        self.inner_corner_value
    }

    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Depth of the dent below the corner envelope (non-positive when useful).
    fn dent(&self) -> f64 {
        self.value - self.inner_corner_value
    }
}

/// Largest `t <= 1` with `t * c <= b`, or `None` when `c` has support
/// outside `b`.
///
/// # Errors
///
/// [`SearchError::RatioOutOfRange`] when the ratio exceeds 1 by more than
/// [`RATIO_TOLERANCE`].
pub fn min_ratio(b: &SparseVector, c: &SparseVector) -> Result<Option<f64>, SearchError> {
    let mut ratio = f64::INFINITY;
    for (i, ci) in c.iter() {
        let bi = b.get(i);
        if bi == 0.0 {
            return Ok(None);
        }
        ratio = ratio.min(bi / ci);
    }
    if !ratio.is_finite() {
        return Ok(None);
    }
    if ratio > 1.0 + RATIO_TOLERANCE {
        return Err(SearchError::RatioOutOfRange { ratio });
    }
    Ok(Some(ratio.min(1.0)))
}

/// Point-set upper bound over beliefs of a [`TabularPomdp`].
#[derive(Debug)]
pub struct SawtoothUpperBound<'a> {
    model: &'a TabularPomdp,
    init: UpperBoundInit,
    use_support_list: bool,
    max_iterations: usize,
    prune_growth_factor: f64,
    prune_min_increment: usize,
    corner: Vec<f64>,
    fib_planes: Vec<Vec<f64>>,
    pts: BTreeMap<u64, BvPair>,
    support: Vec<BTreeSet<u64>>,
    next_id: u64,
    clock: u64,
    last_prune_clock: u64,
    next_prune_at: usize,
    initialized: bool,
}

impl<'a> SawtoothUpperBound<'a> {
    /// Uninitialized bound; call [`ValueBound::initialize`] before use.
    #[must_use]
    pub fn new(model: &'a TabularPomdp, config: &SolverConfig) -> Self {
        Self {
            model,
            init: config.upper_bound_init,
            use_support_list: config.use_sawtooth_support_list,
            max_iterations: config.init_max_iterations,
            prune_growth_factor: config.prune_growth_factor,
            prune_min_increment: config.prune_min_increment,
            corner: Vec::new(),
            fib_planes: Vec::new(),
            pts: BTreeMap::new(),
            support: Vec::new(),
            next_id: 0,
            clock: 0,
            last_prune_clock: 0,
            next_prune_at: config.prune_min_increment,
            initialized: false,
        }
    }

    /// Envelope value at every basis state.
    #[must_use]
    pub fn corner(&self) -> &[f64] {
        &self.corner
    }

    #[must_use]
    pub fn witness_count(&self) -> usize {
        self.pts.len()
    }

    /// Witnesses in insertion order.
    pub fn witnesses(&self) -> impl Iterator<Item = &BvPair> + '_ {
        self.pts.values()
    }

    /// Ids of the witnesses with nonzero weight on `dim`.
    pub fn support_list(&self, dim: usize) -> impl Iterator<Item = u64> + '_ {
        self.support.get(dim).into_iter().flatten().copied()
    }

    /// Record that the true value at `state` is at most `value`.
    ///
    /// Basis states lower their corner entry. Other states become a witness
    /// unless the current sawtooth already lies at or below `value`. Returns
    /// whether the bound changed.
    ///
    /// # Errors
    ///
    /// Ratio consistency failures, from evaluation or from pruning.
    pub fn add_witness(&mut self, state: &SparseVector, value: f64) -> Result<bool, SearchError> {
        self.ensure_initialized()?;
        self.clock += 1;
        if let Some(s) = state.unit_index() {
            if value < self.corner[s] {
                self.set_corner(s, value);
                return Ok(true);
            }
            return Ok(false);
        }
        if value >= self.sawtooth_value(state)? - DOMINATION_TOLERANCE {
            return Ok(false);
        }
        let id = self.next_id;
        self.next_id += 1;
        for dim in state.support() {
            self.support[dim].insert(id);
        }
        self.pts.insert(
            id,
            BvPair {
                id,
                inner_corner_value: state.dot_dense(&self.corner),
                state: state.clone(),
                value,
                created_at: self.clock,
            },
        );
        if self.pts.len() >= self.next_prune_at {
            self.prune_dominated()?;
        }
        Ok(true)
    }

    /// Delete every witness whose dent is implied by the corner envelope or
    /// by another witness. Pairs that were both present at the previous
    /// prune are not compared again. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Ratio consistency failures.
    pub fn prune_dominated(&mut self) -> Result<usize, SearchError> {
        let before = self.pts.len();
        let ids: Vec<u64> = self.pts.keys().copied().collect();
        for y_id in ids {
            let Some(y) = self.pts.get(&y_id) else {
                continue;
            };
            let mut dominated = y.dent() >= -DOMINATION_TOLERANCE;
            if !dominated {
                for x_id in self.candidates(&y.state) {
                    if x_id == y_id {
                        continue;
                    }
                    let Some(x) = self.pts.get(&x_id) else {
                        continue;
                    };
                    if x.created_at <= self.last_prune_clock
                        && y.created_at <= self.last_prune_clock
                    {
                        continue;
                    }
                    if let Some(ratio) = min_ratio(&y.state, &x.state)? {
                        let at_y = y.inner_corner_value + ratio * x.dent();
                        if at_y <= y.value + DOMINATION_TOLERANCE {
                            dominated = true;
                            break;
                        }
                    }
                }
            }
            if dominated {
                self.remove(y_id);
            }
        }
        let removed = before - self.pts.len();
        self.last_prune_clock = self.clock;
        let len = self.pts.len();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let grown = (len as f64 * self.prune_growth_factor).ceil() as usize;
        self.next_prune_at = grown.max(len + self.prune_min_increment);
        debug!(removed, remaining = len, "pruned sawtooth witnesses");
        Ok(removed)
    }

    fn ensure_initialized(&self) -> Result<(), SearchError> {
        if self.initialized {
            Ok(())
        } else {
            Err(SearchError::BoundInitialization {
                detail: "sawtooth upper bound used before initialize".into(),
            })
        }
    }

    /// Witness ids that may bound `b`: those sharing support with it.
    fn candidates(&self, b: &SparseVector) -> Vec<u64> {
        if self.use_support_list {
            let ids: BTreeSet<u64> = b
                .support()
                .flat_map(|dim| self.support[dim].iter().copied())
                .collect();
            ids.into_iter().collect()
        } else {
            self.pts.keys().copied().collect()
        }
    }

    fn set_corner(&mut self, dim: usize, value: f64) {
        let delta = value - self.corner[dim];
        self.corner[dim] = value;
        for id in &self.support[dim] {
            if let Some(p) = self.pts.get_mut(id) {
                p.inner_corner_value += p.state.get(dim) * delta;
            }
        }
    }

    fn remove(&mut self, id: u64) {
        if let Some(p) = self.pts.remove(&id) {
            for dim in p.state.support() {
                self.support[dim].remove(&id);
            }
        }
    }

    fn sawtooth_value(&self, b: &SparseVector) -> Result<f64, SearchError> {
        let corner_value = b.dot_dense(&self.corner);
        let mut best = corner_value;
        for id in self.candidates(b) {
            let Some(c) = self.pts.get(&id) else {
                continue;
            };
            if let Some(ratio) = min_ratio(b, &c.state)? {
                best = best.min(corner_value + ratio * c.dent());
            }
        }
        Ok(best)
    }
}

impl ValueBound for SawtoothUpperBound<'_> {
    fn initialize(&mut self, target_precision: f64) -> Result<(), SearchError> {
        let limits = IterationLimits::for_precision(target_precision, self.max_iterations);
        let n = self.model.num_states();
        self.fib_planes.clear();
        self.corner = match self.init {
            UpperBoundInit::MaxReward => max_reward_envelope(self.model)?,
            UpperBoundInit::RelaxedMdp => relaxed_mdp_values(self.model, limits)?,
            UpperBoundInit::Fib if self.model.is_fully_observable() => {
                relaxed_mdp_values(self.model, limits)?
            }
            UpperBoundInit::Fib => {
                let planes = fast_informed_bound(self.model, limits)?;
                let corner = upper_envelope(&planes, n);
                self.fib_planes = planes;
                corner
            }
        };
        self.pts.clear();
        self.support = vec![BTreeSet::new(); n];
        self.initialized = true;
        info!(
            init = self.init.as_str(),
            states = n,
            fib_planes = self.fib_planes.len(),
            "sawtooth upper bound initialized"
        );
        Ok(())
    }

    fn value(&self, state: &SparseVector) -> Result<f64, SearchError> {
        self.ensure_initialized()?;
        let sawtooth = self.sawtooth_value(state)?;
        let dense = state.to_dense();
        let fib = self
            .fib_planes
            .iter()
            .map(|alpha| dense_dot(alpha, &dense))
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(if self.fib_planes.is_empty() {
            sawtooth
        } else {
            sawtooth.min(fib)
        })
    }
}

impl UpperBound for SawtoothUpperBound<'_> {
    fn update(&mut self, graph: &mut StateGraph, id: NodeId) -> Result<usize, SearchError> {
        let Some((action, backed)) = backup_upper(graph, id, self.model.discount()) else {
            return Ok(0);
        };
        let node = graph.node_mut(id);
        let value = node.upper.min(backed);
        node.upper = value;
        self.add_witness(&graph.node(id).state, value)?;
        Ok(action)
    }
}
