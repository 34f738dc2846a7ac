//! Focused RTDP.
//!
//! A trial follows the greedy action and, among its outcomes, the successor
//! with the highest log-space priority (occupancy times the successor's
//! own priority). A branch stops when it passes the adaptive depth limit,
//! when the node's excess width is gone, or when the path priority falls
//! below the best alternative left behind higher up the path.
//!
//! The depth limit adapts after every trial: update quality (interval
//! tightening weighted by occupancy) in the deep part of the trial is
//! compared with the shallow part.

use tracing::debug;

use super::{excess_width, refresh_priority, Ranked, TrialStrategy};
use crate::config::SolverConfig;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::node::NodeId;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Quality {
    sum: f64,
    updates: u64,
}

impl Quality {
    fn add(&mut self, q: f64) {
        if q.is_finite() {
            self.sum += q;
        }
        self.updates += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(self) -> f64 {
        if self.updates == 0 {
            0.0
        } else {
            self.sum / self.updates as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frtdp {
    initial_depth: f64,
    max_depth: f64,
    ratio: f64,
    depth_cap: f64,
    deep: Quality,
    shallow: Quality,
    hit_depth_limit: bool,
}

impl Frtdp {
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        let initial_depth = f64::from(config.initial_max_depth);
        Self {
            initial_depth,
            max_depth: initial_depth,
            ratio: config.depth_adjust_ratio,
            depth_cap: f64::from(config.max_trial_depth),
            deep: Quality::default(),
            shallow: Quality::default(),
            hit_depth_limit: false,
        }
    }

    /// Current adaptive depth limit.
    #[must_use]
    pub fn max_depth(&self) -> f64 {
        self.max_depth
    }

    fn track_update<M: Model + ?Sized>(
        &mut self,
        core: &mut SearchCore<'_, M>,
        id: NodeId,
        log_occupancy: f64,
        depth: u32,
    ) -> Result<(Ranked, f64), SearchError> {
        let backup = core.update(id)?;
        let quality = backup.improvement() * log_occupancy.exp();
        if f64::from(depth) > self.max_depth / self.ratio {
            self.deep.add(quality);
        } else {
            self.shallow.add(quality);
        }
        let ranked = refresh_priority(core, id, backup.action, depth);
        Ok((ranked, excess_width(core, id, depth)))
    }

    fn recurse<M: Model + ?Sized>(
        &mut self,
        core: &mut SearchCore<'_, M>,
        id: NodeId,
        log_occupancy: f64,
        depth: u32,
        alternative: f64,
    ) -> Result<(), SearchError> {
        let (ranked, excess) = self.track_update(core, id, log_occupancy, depth)?;
        if f64::from(depth) >= self.max_depth {
            self.hit_depth_limit = true;
            return Ok(());
        }
        if excess <= 0.0 {
            return Ok(());
        }
        let Some(best) = ranked.best else {
            return Ok(());
        };
        if log_occupancy + best.score < alternative {
            return Ok(());
        }
        let child_alternative = alternative.max(log_occupancy + ranked.second);
        self.recurse(
            core,
            best.next,
            log_occupancy + best.log_weight,
            depth + 1,
            child_alternative,
        )?;
        self.track_update(core, id, log_occupancy, depth)?;
        Ok(())
    }

    fn adapt_depth(&mut self) {
        let (deep, shallow) = (self.deep.mean(), self.shallow.mean());
        if self.hit_depth_limit && deep >= shallow {
            self.max_depth = (self.max_depth * self.ratio).min(self.depth_cap);
        } else if deep < 0.5 * shallow {
            self.max_depth = (self.max_depth / self.ratio).max(self.initial_depth);
        }
        debug!(
            deep_quality = deep,
            shallow_quality = shallow,
            max_depth = self.max_depth,
            "frtdp depth adapted"
        );
        self.deep = Quality::default();
        self.shallow = Quality::default();
        self.hit_depth_limit = false;
    }
}

impl<M: Model + ?Sized> TrialStrategy<M> for Frtdp {
    fn requires_lower_bound(&self) -> bool {
        true
    }

    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError> {
        let root = core.root();
        self.recurse(core, root, 0.0, 0, f64::NEG_INFINITY)?;
        self.adapt_depth();
        Ok(())
    }
}
