//! Adaptive RTDP.
//!
//! Descends like FRTDP (greedy action, maximum-priority outcome) but stops a
//! branch when any of four running statistics falls below the quantile
//! threshold its tracker has learned so far:
//!
//! - `f`: path log occupancy plus the node's priority,
//! - discrepancy: log of the interval tightening of the node's backup,
//! - negative depth,
//! - path log occupancy.
//!
//! Each tracker samples its statistic into a fixed-size reservoir that
//! persists across trials, so the threshold is a running quantile over the
//! whole run. When a trial fails to tighten the root, every threshold is
//! lifted to `-inf` for the next trial (only the hard stops apply) and the
//! trackers that cut the stalled trial short halve their quantile level.
//! After a productive trial levels recover toward the configured one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{excess_width, priority_of, refresh_priority, TrialStrategy};
use crate::config::SolverConfig;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::node::NodeId;

/// Level recovery factor after a trial that tightened the root.
const LEVEL_RECOVERY: f64 = 1.5;

/// A trial that tightens the root by less than this share of the target
/// precision counts as stalled.
const STALL_FRACTION: f64 = 1e-3;

/// Running quantile estimate of one statistic.
#[derive(Debug, Clone)]
pub struct ThresholdTracker {
    name: &'static str,
    base_level: f64,
    level: f64,
    threshold: f64,
    capacity: usize,
    reservoir: Vec<f64>,
    seen: u64,
    caused_stop: bool,
    rng: StdRng,
}

impl ThresholdTracker {
    #[must_use]
    pub fn new(name: &'static str, level: f64, capacity: usize, seed: u64) -> Self {
        Self {
            name,
            base_level: level,
            level,
            threshold: f64::NEG_INFINITY,
            capacity,
            reservoir: Vec::with_capacity(capacity),
            seen: 0,
            caused_stop: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Reservoir sampling (algorithm R); NaN samples are ignored.
    pub fn observe(&mut self, x: f64) {
        if x.is_nan() {
            return;
        }
        self.seen += 1;
        if self.reservoir.len() < self.capacity {
            self.reservoir.push(x);
        } else {
            let j = self.rng.gen_range(0..self.seen);
            if let Ok(j) = usize::try_from(j) {
                if j < self.capacity {
                    self.reservoir[j] = x;
                }
            }
        }
    }

    /// `true` (and remembered) when `x` lies below the current threshold.
    pub fn stops(&mut self, x: f64) -> bool {
        let stop = x < self.threshold;
        self.caused_stop |= stop;
        stop
    }

    /// Close a trial. After a stalled trial the threshold is lifted to
    /// `-inf`, and the level halves if this tracker cut the trial short.
    /// Otherwise the level recovers and the threshold becomes the level
    /// quantile of every sample kept so far.
    pub fn end_trial(&mut self, stalled: bool) {
        if stalled {
            if self.caused_stop {
                self.level *= 0.5;
            }
            self.threshold = f64::NEG_INFINITY;
        } else {
            self.level = (self.level * LEVEL_RECOVERY).min(self.base_level);
            if !self.reservoir.is_empty() {
                let mut sorted = self.reservoir.clone();
                sorted.sort_by(f64::total_cmp);
                #[allow(
                    clippy::cast_precision_loss,
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss
                )]
                let idx = (self.level * (sorted.len() - 1) as f64).floor() as usize;
                self.threshold = sorted[idx.min(sorted.len() - 1)];
            }
        }
        debug!(
            tracker = self.name,
            stalled,
            level = self.level,
            threshold = self.threshold,
            samples = self.reservoir.len(),
            seen = self.seen,
            "artdp threshold updated"
        );
        self.caused_stop = false;
    }
}

#[derive(Debug, Clone)]
pub struct Artdp {
    f_value: ThresholdTracker,
    discrepancy: ThresholdTracker,
    negative_depth: ThresholdTracker,
    log_occupancy: ThresholdTracker,
}

impl Artdp {
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        let (level, size, seed) = (
            config.artdp_quantile,
            config.artdp_reservoir_size,
            config.seed,
        );
        Self {
            f_value: ThresholdTracker::new("f_value", level, size, seed.wrapping_add(1)),
            discrepancy: ThresholdTracker::new("discrepancy", level, size, seed.wrapping_add(2)),
            negative_depth: ThresholdTracker::new(
                "negative_depth",
                level,
                size,
                seed.wrapping_add(3),
            ),
            log_occupancy: ThresholdTracker::new(
                "log_occupancy",
                level,
                size,
                seed.wrapping_add(4),
            ),
        }
    }

    #[must_use]
    pub fn trackers(&self) -> [&ThresholdTracker; 4] {
        [
            &self.f_value,
            &self.discrepancy,
            &self.negative_depth,
            &self.log_occupancy,
        ]
    }

    fn trackers_mut(&mut self) -> [&mut ThresholdTracker; 4] {
        [
            &mut self.f_value,
            &mut self.discrepancy,
            &mut self.negative_depth,
            &mut self.log_occupancy,
        ]
    }

    fn recurse<M: Model + ?Sized>(
        &mut self,
        core: &mut SearchCore<'_, M>,
        id: NodeId,
        log_occupancy: f64,
        depth: u32,
    ) -> Result<(), SearchError> {
        let backup = core.update(id)?;
        let ranked = refresh_priority(core, id, backup.action, depth);
        if core.node(id).is_terminal
            || depth >= core.config().max_trial_depth
            || excess_width(core, id, depth) <= 0.0
        {
            return Ok(());
        }
        if depth > 0 {
            let stats = [
                log_occupancy + priority_of(core, id, depth),
                backup.improvement().ln(),
                -f64::from(depth),
                log_occupancy,
            ];
            let mut stop = false;
            for (tracker, x) in self.trackers_mut().into_iter().zip(stats) {
                tracker.observe(x);
                stop |= tracker.stops(x);
            }
            if stop {
                return Ok(());
            }
        }
        let Some(best) = ranked.best else {
            return Ok(());
        };
        self.recurse(core, best.next, log_occupancy + best.log_weight, depth + 1)?;
        let backup = core.update(id)?;
        refresh_priority(core, id, backup.action, depth);
        Ok(())
    }
}

impl<M: Model + ?Sized> TrialStrategy<M> for Artdp {
    fn requires_lower_bound(&self) -> bool {
        true
    }

    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError> {
        let root = core.root();
        let before = core.node(root).width();
        self.recurse(core, root, 0.0, 0)?;
        let after = core.node(root).width();
        let stalled = before - after < STALL_FRACTION * core.config().target_precision;
        for tracker in self.trackers_mut() {
            tracker.end_trial(stalled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_kernel::pomdp::PomdpBuilder;

    #[test]
    fn threshold_is_the_level_quantile_of_the_samples() {
        let mut t = ThresholdTracker::new("t", 0.25, 64, 0);
        assert_eq!(t.threshold(), f64::NEG_INFINITY);
        assert!(!t.stops(-1e300));
        for x in 0..9 {
            t.observe(f64::from(x));
        }
        t.end_trial(false);
        assert_eq!(t.threshold(), 2.0);
        assert!(t.stops(1.0));
        assert!(!t.stops(2.0));
    }

    #[test]
    fn samples_persist_across_trials() {
        let mut t = ThresholdTracker::new("t", 0.5, 64, 0);
        for x in 0..5 {
            t.observe(f64::from(x));
        }
        t.end_trial(false);
        assert_eq!(t.threshold(), 2.0);
        // A trial that observes a single shallow sample does not collapse
        // the threshold onto that sample.
        t.observe(-100.0);
        t.end_trial(false);
        assert_eq!(t.threshold(), 1.0);
        // Nor does a trial without samples.
        t.end_trial(false);
        assert_eq!(t.threshold(), 1.0);
        assert_eq!(t.seen, 6);
    }

    #[test]
    fn stalled_trials_lift_the_threshold_and_halve_the_level() {
        let mut t = ThresholdTracker::new("t", 0.2, 8, 0);
        t.observe(1.0);
        t.end_trial(false);
        assert!(t.stops(0.0));
        t.end_trial(true);
        assert_eq!(t.threshold(), f64::NEG_INFINITY);
        assert!(!t.stops(-1e300));
        assert!((t.level() - 0.1).abs() < 1e-12);
        t.end_trial(false);
        assert!((t.level() - 0.15).abs() < 1e-12);
        assert_eq!(t.threshold(), 1.0);
        t.end_trial(false);
        assert!((t.level() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn stalled_trials_keep_the_level_of_trackers_that_did_not_stop() {
        let mut t = ThresholdTracker::new("t", 0.2, 8, 0);
        t.observe(1.0);
        t.end_trial(false);
        assert!(!t.stops(5.0));
        t.end_trial(true);
        assert_eq!(t.threshold(), f64::NEG_INFINITY);
        assert!((t.level() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn reservoir_never_exceeds_capacity() {
        let mut t = ThresholdTracker::new("t", 0.5, 4, 3);
        for x in 0..100 {
            t.observe(f64::from(x));
        }
        assert_eq!(t.reservoir.len(), 4);
        assert_eq!(t.seen, 100);
    }

    #[test]
    fn trials_shrink_the_root_interval() {
        let model = PomdpBuilder::mdp(2, 1)
            .discount(0.9)
            .transition(0, 0, 0, 0.5)
            .transition(0, 0, 1, 0.5)
            .reward(0, 0, -1.0)
            .terminal(1)
            .build()
            .unwrap();
        let config = SolverConfig {
            upper_bound_init: crate::config::UpperBoundInit::MaxReward,
            lower_bound_init: crate::config::LowerBoundInit::WorstCase,
            ..SolverConfig::default()
        };
        let mut core = SearchCore::new(&model, config.clone()).unwrap();
        let mut artdp = Artdp::new(&config);
        let (l0, u0) = core.root_interval();
        artdp.run_trial(&mut core).unwrap();
        let (l1, u1) = core.root_interval();
        assert!(u1 - l1 < u0 - l0);
        assert_eq!(artdp.trackers().len(), 4);
    }
}
