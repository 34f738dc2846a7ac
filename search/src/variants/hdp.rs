//! HDP: depth-first trials over the greedy graph with Tarjan-style
//! strongly-connected-component labeling.
//!
//! A node whose backup still moves its upper value by more than the target
//! precision stops the descent. Otherwise every non-negligible outcome of
//! the greedy action is visited. When a component closes (low-link equals
//! index) and nothing below it needed work, all of its members are labeled
//! solved. With a lower bound, a node wider than the target precision also
//! counts as needing work; action selection stays upper-bound greedy.

use tracing::trace;

use super::TrialStrategy;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::node::{NodeId, SccData, SearchAux};

#[derive(Debug, Default, Clone)]
pub struct Hdp {
    /// Trial counter; node data from older trials is stale.
    stamp: u64,
    next_index: u64,
    stack: Vec<NodeId>,
}

impl Hdp {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data<M: Model + ?Sized>(core: &SearchCore<'_, M>, id: NodeId) -> SccData {
        match core.node(id).aux {
            SearchAux::Scc(data) => data,
            _ => SccData {
                solved: false,
                index: 0,
                low_link: 0,
                in_stack: false,
                stamp: 0,
            },
        }
    }

    fn set<M: Model + ?Sized>(core: &mut SearchCore<'_, M>, id: NodeId, data: SccData) {
        core.node_mut(id).aux = SearchAux::Scc(data);
    }

    fn visited<M: Model + ?Sized>(&self, core: &SearchCore<'_, M>, id: NodeId) -> bool {
        Self::data(core, id).stamp == self.stamp
    }

    /// Returns `true` when some node at or below `id` still needs work.
    fn dfs<M: Model + ?Sized>(
        &mut self,
        core: &mut SearchCore<'_, M>,
        id: NodeId,
        depth: u32,
    ) -> Result<bool, SearchError> {
        if core.node(id).is_solved() {
            return Ok(false);
        }
        let epsilon = core.target_precision();
        let backup = core.update(id)?;
        if backup.upper_change().abs() > epsilon {
            return Ok(true);
        }
        if depth >= core.config().max_trial_depth {
            return Ok(true);
        }
        let index = self.next_index;
        self.next_index += 1;
        let mut data = SccData {
            solved: false,
            index,
            low_link: index,
            in_stack: true,
            stamp: self.stamp,
        };
        Self::set(core, id, data);
        self.stack.push(id);

        let mut flag = core.has_lower_bound() && backup.width_after() > epsilon;
        if let Some(action) = core.greedy_action(id) {
            let successors: Vec<NodeId> = core.node(id).q[action]
                .outcomes
                .iter()
                .map(|e| e.next)
                .collect();
            for next in successors {
                if core.node(next).is_solved() {
                    continue;
                }
                if self.visited(core, next) {
                    let next_data = Self::data(core, next);
                    if next_data.in_stack {
                        data.low_link = data.low_link.min(next_data.index);
                    }
                } else {
                    let below = self.dfs(core, next, depth + 1)?;
                    flag = below || flag;
                    data.low_link = data.low_link.min(Self::data(core, next).low_link);
                }
            }
        }
        Self::set(core, id, data);

        if flag {
            core.update(id)?;
        } else if data.low_link == data.index {
            let mut labeled = 0usize;
            while let Some(&top) = self.stack.last() {
                let mut top_data = Self::data(core, top);
                if top_data.index < data.index {
                    break;
                }
                self.stack.pop();
                top_data.in_stack = false;
                top_data.solved = true;
                Self::set(core, top, top_data);
                labeled += 1;
            }
            trace!(labeled, "hdp labeled a component");
        }
        Ok(flag)
    }
}

impl<M: Model + ?Sized> TrialStrategy<M> for Hdp {
    fn labels_solved(&self) -> bool {
        true
    }

    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError> {
        self.stamp += 1;
        self.next_index = 0;
        self.stack.clear();
        let root = core.root();
        self.dfs(core, root, 0)?;
        Ok(())
    }
}
