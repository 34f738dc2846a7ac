//! Labeled RTDP.
//!
//! Trials descend like RTDP but stop at solved nodes. On the way back each
//! path node runs `check_solved`, a depth-first sweep over the greedy
//! envelope below it; the first failing check ends the trial.

use std::collections::BTreeSet;

use tracing::trace;

use super::TrialStrategy;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::node::{NodeId, SearchAux};

#[derive(Debug, Default, Clone, Copy)]
pub struct Lrtdp;

fn mark_solved<M: Model + ?Sized>(core: &mut SearchCore<'_, M>, id: NodeId) {
    core.node_mut(id).aux = SearchAux::Labeled { solved: true };
}

/// Label the greedy envelope under `root` solved if every node in it has a
/// residual within the target precision; otherwise back the visited nodes
/// up again in reverse order. Returns whether `root` is now solved.
///
/// # Errors
///
/// Fatal consistency failures from backups.
pub fn check_solved<M: Model + ?Sized>(
    core: &mut SearchCore<'_, M>,
    root: NodeId,
) -> Result<bool, SearchError> {
    if core.node(root).is_solved() {
        return Ok(true);
    }
    let epsilon = core.target_precision();
    let mut consistent = true;
    let mut open = vec![root];
    let mut closed = Vec::new();
    let mut seen = BTreeSet::from([root]);
    while let Some(id) = open.pop() {
        closed.push(id);
        let backup = core.update(id)?;
        if core.residual(&backup) > epsilon {
            consistent = false;
            continue;
        }
        let Some(action) = backup.action else {
            continue;
        };
        let successors: Vec<NodeId> = core.node(id).q[action]
            .outcomes
            .iter()
            .map(|e| e.next)
            .collect();
        for next in successors {
            if !core.node(next).is_solved() && seen.insert(next) {
                open.push(next);
            }
        }
    }
    if consistent {
        for &id in &closed {
            mark_solved(core, id);
        }
        trace!(labeled = closed.len(), "lrtdp labeled a solved region");
    } else {
        for &id in closed.iter().rev() {
            core.update(id)?;
        }
    }
    Ok(consistent)
}

impl<M: Model + ?Sized> TrialStrategy<M> for Lrtdp {
    fn labels_solved(&self) -> bool {
        true
    }

    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError> {
        let max_depth = core.config().max_trial_depth as usize;
        let mut path = Vec::new();
        let mut id = core.root();
        while !core.node(id).is_solved() && path.len() <= max_depth {
            let backup = core.update(id)?;
            path.push(id);
            let Some(action) = backup.action else {
                break;
            };
            match core.sample_outcome(id, action) {
                Some(next) => id = next,
                None => break,
            }
        }
        while let Some(id) = path.pop() {
            if !check_solved(core, id)? {
                break;
            }
        }
        Ok(())
    }
}
