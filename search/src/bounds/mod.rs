//! Value bounds: the capability traits and the shared backup helpers.
//!
//! A bound answers `value(state)` after a one-time `initialize`. The
//! incremental variants used inside the search core also back up a graph
//! node in place through `update`, which may grow the bound's own
//! representation (witness points or planes).

pub mod init;
pub mod planes;
pub mod sawtooth;

use horizon_kernel::vector::SparseVector;

use crate::cache::StateGraph;
use crate::config::SolverConfig;
use crate::contract::Model;
use crate::error::SearchError;
use crate::node::{argmax, Node, NodeId, QEntry};

/// Two-method contract shared by every bound.
pub trait ValueBound {
    /// One-time, possibly expensive setup. Must run before [`ValueBound::value`].
    ///
    /// # Errors
    ///
    /// [`SearchError::BoundInitialization`] when no admissible bound exists.
    fn initialize(&mut self, target_precision: f64) -> Result<(), SearchError>;

    /// Current bound value at `state`.
    ///
    /// # Errors
    ///
    /// Internal consistency failures only.
    fn value(&self, state: &SparseVector) -> Result<f64, SearchError>;
}

/// Bound refined downward by min-form backups.
pub trait UpperBound: ValueBound {
    /// Back up the (expanded) node `id`: refresh every action's cached upper
    /// value, lower the node's upper value to the best one (never raising
    /// it) and record the new value in the bound. Returns the greedy action.
    ///
    /// # Errors
    ///
    /// Internal consistency failures.
    fn update(&mut self, graph: &mut StateGraph, id: NodeId) -> Result<usize, SearchError>;
}

/// Bound refined upward by max-form backups.
pub trait LowerBound: ValueBound {
    /// Mirror of [`UpperBound::update`]: the node's lower value never drops.
    ///
    /// # Errors
    ///
    /// Internal consistency failures.
    fn update(&mut self, graph: &mut StateGraph, id: NodeId) -> Result<usize, SearchError>;
}

/// The initialized bounds a search run works with.
pub struct BoundPair<'a> {
    pub lower: Option<Box<dyn LowerBound + 'a>>,
    pub upper: Box<dyn UpperBound + 'a>,
}

impl<'a> BoundPair<'a> {
    /// Build both bounds through the model's factories and initialize them.
    /// The lower bound is skipped when `config.use_lower_bound` is off.
    ///
    /// # Errors
    ///
    /// [`SearchError::MissingBound`] when a required factory is unsupported,
    /// or any initialization failure.
    pub fn new<M: Model + ?Sized>(model: &'a M, config: &SolverConfig) -> Result<Self, SearchError> {
        let mut upper = model
            .new_upper_bound(config)
            .ok_or(SearchError::MissingBound { kind: "upper" })?;
        upper.initialize(config.target_precision)?;
        let lower = if config.use_lower_bound {
            let mut lower = model
                .new_lower_bound(config)
                .ok_or(SearchError::MissingBound { kind: "lower" })?;
            lower.initialize(config.target_precision)?;
            Some(lower)
        } else {
            None
        };
        Ok(Self { lower, upper })
    }
}

impl std::fmt::Debug for BoundPair<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundPair")
            .field("lower", &self.lower.is_some())
            .finish_non_exhaustive()
    }
}

/// Recompute one side of every action's cached value from the successors'
/// current node values. Returns the best action and its value, or `None`
/// for a node with no actions (terminal or fringe).
fn refresh_q(
    graph: &mut StateGraph,
    id: NodeId,
    discount: f64,
    read: fn(&Node) -> f64,
    write: fn(&mut QEntry, f64),
) -> Option<(usize, f64)> {
    let values: Vec<f64> = graph
        .node(id)
        .q
        .iter()
        .map(|q| q.backup(discount, |n| read(graph.node(n))))
        .collect();
    let best = argmax(values.iter().copied())?;
    for (entry, &v) in graph.node_mut(id).q.iter_mut().zip(&values) {
        write(entry, v);
    }
    Some((best, values[best]))
}

/// Max over actions of the refreshed upper action values.
pub fn backup_upper(graph: &mut StateGraph, id: NodeId, discount: f64) -> Option<(usize, f64)> {
    refresh_q(graph, id, discount, |n| n.upper, |q, v| q.upper = v)
}

/// Max over actions of the refreshed lower action values.
pub fn backup_lower(graph: &mut StateGraph, id: NodeId, discount: f64) -> Option<(usize, f64)> {
    refresh_q(graph, id, discount, |n| n.lower, |q, v| q.lower = v)
}
