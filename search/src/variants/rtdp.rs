//! Plain RTDP: greedy action, sampled outcome, stop at a terminal.

use tracing::trace;

use super::TrialStrategy;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;

#[derive(Debug, Default, Clone, Copy)]
pub struct Rtdp;

impl<M: Model + ?Sized> TrialStrategy<M> for Rtdp {
    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError> {
        let max_depth = core.config().max_trial_depth;
        let mut path = Vec::new();
        let mut id = core.root();
        loop {
            if core.node(id).is_terminal {
                break;
            }
            let backup = core.update(id)?;
            path.push(id);
            let Some(action) = backup.action else {
                break;
            };
            if path.len() > max_depth as usize {
                break;
            }
            match core.sample_outcome(id, action) {
                Some(next) => id = next,
                None => break,
            }
        }
        trace!(depth = path.len(), "rtdp trial reached its end");
        for &id in path.iter().rev() {
            core.update(id)?;
        }
        Ok(())
    }
}
