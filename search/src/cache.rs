//! Reachable state graph with lazy expansion and exact deduplication.
//!
//! Nodes are stored in an arena and addressed by [`NodeId`]. The index maps
//! each node's canonical fingerprint to its arena slot, so two bit-identical
//! state vectors always resolve to the same node. Nodes are never removed
//! while the graph is alive.

use std::collections::BTreeMap;

use horizon_kernel::hash::{state_fingerprint, ContentHash};
use horizon_kernel::vector::SparseVector;

use crate::bounds::BoundPair;
use crate::contract::Model;
use crate::error::SearchError;
use crate::node::{Edge, Node, NodeId, QEntry, SearchAux, OUTCOME_PROB_EPS};

/// Absolute slack tolerated when a lower value sits above an upper value.
pub const CROSSING_TOLERANCE: f64 = 1e-6;

/// Arena of nodes plus the fingerprint index.
#[derive(Debug, Default)]
pub struct StateGraph {
    nodes: Vec<Node>,
    index: BTreeMap<ContentHash, NodeId>,
    expanded: u64,
}

impl StateGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct states created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes whose action structure has been materialized.
    #[must_use]
    pub fn expanded_count(&self) -> u64 {
        self.expanded
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// All nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Read-only lookup; never creates a node.
    #[must_use]
    pub fn lookup(&self, state: &SparseVector) -> Option<NodeId> {
        self.index.get(&state_fingerprint(state)).copied()
    }

    /// Return the node for `state`, creating it on first reference.
    ///
    /// Terminal detection and initial bound evaluation happen exactly once,
    /// here. Terminal nodes are pinned at value 0; without a lower bound the
    /// lower value is negative infinity.
    ///
    /// # Errors
    ///
    /// Propagates bound evaluation failures and reports an initial interval
    /// whose lower value exceeds its upper value beyond round-off.
    pub fn get_node<M: Model + ?Sized>(
        &mut self,
        model: &M,
        bounds: &BoundPair<'_>,
        state: SparseVector,
    ) -> Result<NodeId, SearchError> {
        let fingerprint = state_fingerprint(&state);
        if let Some(&id) = self.index.get(&fingerprint) {
            return Ok(id);
        }
        let id = NodeId(self.nodes.len());
        let is_terminal = model.is_terminal_state(&state);
        let (lower, upper) = if is_terminal {
            (0.0, 0.0)
        } else {
            let upper = bounds.upper.value(&state)?;
            let lower = match &bounds.lower {
                Some(lb) => lb.value(&state)?,
                None => f64::NEG_INFINITY,
            };
            settle_interval(id, lower, upper)?
        };
        self.index.insert(fingerprint.clone(), id);
        self.nodes.push(Node {
            state,
            fingerprint,
            is_terminal,
            lower,
            upper,
            q: Vec::new(),
            aux: SearchAux::Empty,
        });
        Ok(id)
    }

    /// Materialize one [`QEntry`] per action for a fringe node.
    ///
    /// Returns `false` (and does nothing) when the node is terminal or was
    /// already expanded. Successors are created on demand, so the graph may
    /// become cyclic.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`StateGraph::get_node`].
    pub fn expand<M: Model + ?Sized>(
        &mut self,
        model: &M,
        bounds: &BoundPair<'_>,
        id: NodeId,
    ) -> Result<bool, SearchError> {
        if !self.node(id).is_fringe() {
            return Ok(false);
        }
        let state = self.node(id).state.clone();
        let discount = model.discount();
        let mut entries = Vec::with_capacity(model.num_actions());
        for action in 0..model.num_actions() {
            let immediate_reward = model.reward(&state, action);
            let mut outcomes = Vec::new();
            for (outcome, prob) in model.outcome_probs(&state, action).iter() {
                if prob <= OUTCOME_PROB_EPS {
                    continue;
                }
                let next_state = model.next_state(&state, action, outcome);
                let next = self.get_node(model, bounds, next_state)?;
                outcomes.push(Edge {
                    outcome,
                    prob,
                    next,
                });
            }
            let mut entry = QEntry {
                immediate_reward,
                outcomes,
                lower: 0.0,
                upper: 0.0,
            };
            entry.lower = entry.backup(discount, |n| self.node(n).lower);
            entry.upper = entry.backup(discount, |n| self.node(n).upper);
            entries.push(entry);
        }
        self.node_mut(id).q = entries;
        self.expanded += 1;
        Ok(true)
    }
}

/// Accept `lower <= upper` up to [`CROSSING_TOLERANCE`], collapsing round-off
/// crossings onto the upper value.
///
/// # Errors
///
/// [`SearchError::BoundsCrossed`] when the crossing exceeds the tolerance.
pub fn settle_interval(id: NodeId, lower: f64, upper: f64) -> Result<(f64, f64), SearchError> {
    if lower <= upper {
        return Ok((lower, upper));
    }
    let slack = CROSSING_TOLERANCE * upper.abs().max(1.0);
    if lower - upper <= slack {
        Ok((upper, upper))
    } else {
        Err(SearchError::BoundsCrossed {
            node: id.0,
            lower,
            upper,
        })
    }
}
