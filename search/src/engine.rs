//! Shared trial-runner skeleton.
//!
//! [`SearchCore`] owns the state graph and the bounds for one run and
//! provides everything the variants have in common: lazy node creation and
//! expansion, node backups with bookkeeping, greedy action selection,
//! outcome sampling and the read-only query path.

use std::time::Instant;

use horizon_kernel::vector::SparseVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, trace};

use crate::bounds::BoundPair;
use crate::cache::{settle_interval, StateGraph};
use crate::config::SolverConfig;
use crate::contract::Model;
use crate::error::SearchError;
use crate::node::{argmax, Node, NodeId, OUTCOME_PROB_EPS};
use crate::progress::{ProgressSnapshot, SearchStats};

/// Node values before and after one backup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backup {
    /// Greedy upper-bound action after the backup (`None` for terminals).
    pub action: Option<usize>,
    pub lower_before: f64,
    pub lower_after: f64,
    pub upper_before: f64,
    pub upper_after: f64,
}

impl Backup {
    /// How far the upper value dropped.
    #[must_use]
    pub fn upper_change(&self) -> f64 {
        self.upper_before - self.upper_after
    }

    /// How far the lower value rose (0 when no lower bound is maintained).
    #[must_use]
    pub fn lower_change(&self) -> f64 {
        let change = self.lower_after - self.lower_before;
        if change.is_finite() {
            change
        } else {
            0.0
        }
    }

    /// Total tightening of the interval.
    #[must_use]
    pub fn improvement(&self) -> f64 {
        self.upper_change() + self.lower_change()
    }

    #[must_use]
    pub fn width_after(&self) -> f64 {
        self.upper_after - self.lower_after
    }
}

/// Graph, bounds and counters of one run.
pub struct SearchCore<'m, M: Model + ?Sized> {
    model: &'m M,
    config: SolverConfig,
    graph: StateGraph,
    bounds: BoundPair<'m>,
    root: NodeId,
    trials: u64,
    backups: u64,
    rng: StdRng,
    started: Instant,
}

impl<'m, M: Model + ?Sized> SearchCore<'m, M> {
    /// Construct and initialize the bounds, then fetch the root node.
    ///
    /// # Errors
    ///
    /// Configuration, missing-bound and bound initialization failures.
    pub fn new(model: &'m M, config: SolverConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let started = Instant::now();
        let bounds = BoundPair::new(model, &config)?;
        let mut graph = StateGraph::new();
        let root = graph.get_node(model, &bounds, model.initial_state())?;
        let root_node = graph.node(root);
        info!(
            lower = root_node.lower,
            upper = root_node.upper,
            lower_bound = bounds.lower.is_some(),
            init_secs = started.elapsed().as_secs_f64(),
            "bounds initialized"
        );
        Ok(Self {
            model,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            graph,
            bounds,
            root,
            trials: 0,
            backups: 0,
            started,
        })
    }

    #[must_use]
    pub fn model(&self) -> &'m M {
        self.model
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        self.graph.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.graph.node_mut(id)
    }

    #[must_use]
    pub fn has_lower_bound(&self) -> bool {
        self.bounds.lower.is_some()
    }

    #[must_use]
    pub fn discount(&self) -> f64 {
        self.model.discount()
    }

    #[must_use]
    pub fn target_precision(&self) -> f64 {
        self.config.target_precision
    }

    /// Node for `state`, created on first reference.
    ///
    /// # Errors
    ///
    /// Bound evaluation failures.
    pub fn get_node(&mut self, state: SparseVector) -> Result<NodeId, SearchError> {
        self.graph.get_node(self.model, &self.bounds, state)
    }

    /// Expand `id` if it is still fringe.
    ///
    /// # Errors
    ///
    /// Bound evaluation failures for new successors.
    pub fn expand(&mut self, id: NodeId) -> Result<bool, SearchError> {
        self.graph.expand(self.model, &self.bounds, id)
    }

    /// Back up `id` on both sides. Fringe nodes are expanded first;
    /// terminal nodes are left untouched.
    ///
    /// # Errors
    ///
    /// Bound update failures and crossed bounds.
    pub fn update(&mut self, id: NodeId) -> Result<Backup, SearchError> {
        self.expand(id)?;
        let node = self.graph.node(id);
        let (lower_before, upper_before) = (node.lower, node.upper);
        if node.is_terminal {
            return Ok(Backup {
                action: None,
                lower_before,
                lower_after: lower_before,
                upper_before,
                upper_after: upper_before,
            });
        }
        let action = self.bounds.upper.update(&mut self.graph, id)?;
        if let Some(lower) = self.bounds.lower.as_mut() {
            lower.update(&mut self.graph, id)?;
        }
        let node = self.graph.node_mut(id);
        let (lower_after, upper_after) = settle_interval(id, node.lower, node.upper)?;
        node.lower = lower_after;
        self.backups += 1;
        trace!(
            node = %id,
            lower = lower_after,
            upper = upper_after,
            action,
            "backup"
        );
        Ok(Backup {
            action: Some(action),
            lower_before,
            lower_after,
            upper_before,
            upper_after,
        })
    }

    /// Convergence residual of a backup: the remaining width when a lower
    /// bound is maintained, otherwise the size of the upper-value change.
    #[must_use]
    pub fn residual(&self, backup: &Backup) -> f64 {
        if self.has_lower_bound() {
            backup.width_after()
        } else {
            backup.upper_change().abs()
        }
    }

    /// Greedy action on the cached upper action values.
    #[must_use]
    pub fn greedy_action(&self, id: NodeId) -> Option<usize> {
        self.graph.node(id).best_upper_action()
    }

    /// Draw one successor of `(id, action)` from its outcome distribution.
    pub fn sample_outcome(&mut self, id: NodeId, action: usize) -> Option<NodeId> {
        let outcomes = &self.graph.node(id).q.get(action)?.outcomes;
        let total: f64 = outcomes.iter().map(|e| e.prob).sum();
        let mut draw = self.rng.gen::<f64>() * total;
        for edge in outcomes {
            draw -= edge.prob;
            if draw < 0.0 {
                return Some(edge.next);
            }
        }
        outcomes.last().map(|e| e.next)
    }

    pub(crate) fn count_trial(&mut self) {
        self.trials += 1;
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        SearchStats {
            states_touched: self.graph.len() as u64,
            states_expanded: self.graph.expanded_count(),
            trials: self.trials,
            backups: self.backups,
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    #[must_use]
    pub fn root_interval(&self) -> (f64, f64) {
        let root = self.graph.node(self.root);
        (root.lower, root.upper)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let (lower, upper) = self.root_interval();
        ProgressSnapshot {
            elapsed_secs: self.elapsed_secs(),
            lower,
            upper,
            stats: self.stats(),
        }
    }

    /// `[lower, upper]` at `state` without touching the graph: cached node
    /// values when the state was visited, fresh bound values otherwise.
    ///
    /// # Errors
    ///
    /// Bound evaluation failures.
    pub fn peek_interval(&self, state: &SparseVector) -> Result<(f64, f64), SearchError> {
        if let Some(id) = self.graph.lookup(state) {
            let node = self.graph.node(id);
            return Ok((node.lower, node.upper));
        }
        if self.model.is_terminal_state(state) {
            return Ok((0.0, 0.0));
        }
        let upper = self.bounds.upper.value(state)?;
        let lower = match &self.bounds.lower {
            Some(lb) => lb.value(state)?,
            None => f64::NEG_INFINITY,
        };
        Ok((lower, upper))
    }

    /// Best action at `state` for execution: lower-bound greedy when a
    /// lower bound is maintained, upper-bound greedy otherwise. Expanded
    /// nodes use their cached action values; other states get a one-step
    /// lookahead on peeked successor values. `None` for terminal states.
    ///
    /// # Errors
    ///
    /// Bound evaluation failures.
    pub fn choose_action(&self, state: &SparseVector) -> Result<Option<usize>, SearchError> {
        let use_lower = self.has_lower_bound();
        if let Some(id) = self.graph.lookup(state) {
            let node = self.graph.node(id);
            if node.is_terminal {
                return Ok(None);
            }
            if !node.q.is_empty() {
                return Ok(if use_lower {
                    node.best_lower_action()
                } else {
                    node.best_upper_action()
                });
            }
        } else if self.model.is_terminal_state(state) {
            return Ok(None);
        }
        let discount = self.discount();
        let mut values = Vec::with_capacity(self.model.num_actions());
        for action in 0..self.model.num_actions() {
            let mut expected = 0.0;
            for (outcome, prob) in self.model.outcome_probs(state, action).iter() {
                if prob <= OUTCOME_PROB_EPS {
                    continue;
                }
                let next = self.model.next_state(state, action, outcome);
                let (lower, upper) = self.peek_interval(&next)?;
                expected += prob * if use_lower { lower } else { upper };
            }
            values.push(self.model.reward(state, action) + discount * expected);
        }
        Ok(argmax(values.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_kernel::pomdp::{PomdpBuilder, TabularPomdp};

    /// State 0 picks between a sure 1 (a0) and a coin flip for 0 or 4 (a1);
    /// every outcome is terminal.
    fn gamble() -> TabularPomdp {
        PomdpBuilder::mdp(4, 2)
            .discount(0.9)
            .transition(0, 0, 1, 1.0)
            .transition(0, 1, 2, 0.5)
            .transition(0, 1, 3, 0.5)
            .reward(0, 0, 1.0)
            .reward(0, 1, 2.0)
            .terminal(1)
            .terminal(2)
            .terminal(3)
            .build()
            .unwrap()
    }

    #[test]
    fn update_closes_a_one_step_problem() {
        let model = gamble();
        let mut core = SearchCore::new(&model, SolverConfig::default()).unwrap();
        let root = core.root();
        let backup = core.update(root).unwrap();
        assert_eq!(backup.action, Some(1));
        assert!((backup.upper_after - 2.0).abs() < 1e-12);
        assert!((backup.lower_after - 2.0).abs() < 1e-12);
        assert!(backup.upper_change() >= 0.0);
        assert!(backup.lower_change() >= 0.0);
        assert_eq!(core.stats().backups, 1);
        assert_eq!(core.stats().states_expanded, 1);
    }

    #[test]
    fn terminal_update_is_a_no_op() {
        let model = gamble();
        let mut core = SearchCore::new(&model, SolverConfig::default()).unwrap();
        let leaf = core.get_node(SparseVector::unit(4, 1)).unwrap();
        let backup = core.update(leaf).unwrap();
        assert_eq!(backup.action, None);
        assert_eq!(core.stats().backups, 0);
    }

    #[test]
    fn sampling_is_seeded() {
        let model = gamble();
        let draws = |seed: u64| {
            let config = SolverConfig {
                seed,
                ..SolverConfig::default()
            };
            let mut core = SearchCore::new(&model, config).unwrap();
            let root = core.root();
            core.expand(root).unwrap();
            (0..32)
                .map(|_| core.sample_outcome(root, 1).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draws(7), draws(7));
        assert!(draws(7).iter().any(|n| n.index() != draws(7)[0].index()));
    }

    #[test]
    fn queries_do_not_touch_the_graph() {
        let model = gamble();
        let core = SearchCore::new(&model, SolverConfig::default()).unwrap();
        let before = core.stats();
        assert_eq!(core.choose_action(&SparseVector::unit(4, 0)).unwrap(), Some(1));
        assert_eq!(core.choose_action(&SparseVector::unit(4, 2)).unwrap(), None);
        assert_eq!(
            core.peek_interval(&SparseVector::unit(4, 3)).unwrap(),
            (0.0, 0.0)
        );
        assert_eq!(core.stats(), before);
    }
}
