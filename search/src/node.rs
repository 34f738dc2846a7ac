//! State graph nodes, per-action entries and outcome edges.
//!
//! Nodes live in the arena of [`crate::cache::StateGraph`] and refer to
//! each other by [`NodeId`]; edges never own their successor.

use horizon_kernel::hash::ContentHash;
use horizon_kernel::vector::SparseVector;

/// Outcomes at or below this probability are not materialized as edges.
pub const OUTCOME_PROB_EPS: f64 = 1e-10;

/// Dense arena index of a node. Stable for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One materialized outcome of an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Outcome index as reported by the model.
    pub outcome: usize,
    /// Outcome probability (always above [`OUTCOME_PROB_EPS`]).
    pub prob: f64,
    /// Successor node.
    pub next: NodeId,
}

/// Action entry of an expanded node.
#[derive(Debug, Clone, PartialEq)]
pub struct QEntry {
    /// Expected immediate reward.
    pub immediate_reward: f64,
    /// Non-negligible outcomes, in outcome order.
    pub outcomes: Vec<Edge>,
    /// Cached lower action value from the last backup.
    pub lower: f64,
    /// Cached upper action value from the last backup.
    pub upper: f64,
}

impl QEntry {
    /// `R + discount * sum(p * value(next))`.
    pub fn backup(&self, discount: f64, value: impl Fn(NodeId) -> f64) -> f64 {
        let expected: f64 = self.outcomes.iter().map(|e| e.prob * value(e.next)).sum();
        self.immediate_reward + discount * expected
    }
}

/// Per-node data owned by the strongly-connected-component labeling variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SccData {
    pub solved: bool,
    /// Tarjan index, valid only when `stamp` equals the current trial.
    pub index: u64,
    pub low_link: u64,
    pub in_stack: bool,
    /// Trial in which `index`/`low_link` were assigned.
    pub stamp: u64,
}

/// Algorithm-private tagged slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SearchAux {
    #[default]
    Empty,
    /// Labeled RTDP solved flag.
    Labeled { solved: bool },
    /// HDP labeling state.
    Scc(SccData),
    /// Log-space priority of the focused and adaptive variants.
    Priority { priority: f64 },
}

/// A state of the reachable graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub state: SparseVector,
    pub fingerprint: ContentHash,
    pub is_terminal: bool,
    pub lower: f64,
    pub upper: f64,
    /// One entry per action once expanded; empty while fringe.
    pub q: Vec<QEntry>,
    pub aux: SearchAux,
}

impl Node {
    /// Non-terminal and not yet expanded.
    #[must_use]
    pub fn is_fringe(&self) -> bool {
        !self.is_terminal && self.q.is_empty()
    }

    /// `upper - lower` (infinite when no lower bound is maintained).
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Solved label of either labeling variant; terminal nodes count as solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.is_terminal
            || match self.aux {
                SearchAux::Labeled { solved } => solved,
                SearchAux::Scc(data) => data.solved,
                SearchAux::Empty | SearchAux::Priority { .. } => false,
            }
    }

    /// Action with the largest cached upper value (lowest index on ties).
    #[must_use]
    pub fn best_upper_action(&self) -> Option<usize> {
        argmax(self.q.iter().map(|q| q.upper))
    }

    /// Action with the largest cached lower value (lowest index on ties).
    #[must_use]
    pub fn best_lower_action(&self) -> Option<usize> {
        argmax(self.q.iter().map(|q| q.lower))
    }
}

/// Index of the first maximum.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
