//! Trial-recursion strategies plugged into the shared skeleton.
//!
//! Each variant decides which action and outcome a trial descends into,
//! when a branch stops, and what per-node labeling it keeps. Backups, node
//! creation and bookkeeping all go through [`SearchCore`].

pub mod artdp;
pub mod frtdp;
pub mod hdp;
pub mod lrtdp;
pub mod rtdp;

use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::node::{NodeId, SearchAux};

pub use artdp::Artdp;
pub use frtdp::Frtdp;
pub use hdp::Hdp;
pub use lrtdp::Lrtdp;
pub use rtdp::Rtdp;

/// Per-algorithm trial policy.
pub trait TrialStrategy<M: Model + ?Sized> {
    /// Whether the variant needs both bounds to decide where to descend.
    fn requires_lower_bound(&self) -> bool {
        false
    }

    /// Whether the variant can mark the root solved by itself. Variants
    /// that cannot, and run without a lower bound, only stop on a budget.
    fn labels_solved(&self) -> bool {
        false
    }

    /// Run one trial from the root.
    ///
    /// # Errors
    ///
    /// Fatal consistency failures from backups.
    fn run_trial(&mut self, core: &mut SearchCore<'_, M>) -> Result<(), SearchError>;

    /// Root labeled solved by the variant's own rule.
    fn root_solved(&self, core: &SearchCore<'_, M>) -> bool {
        core.node(core.root()).is_solved()
    }
}

/// A successor with its log-space score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RankedOutcome {
    pub next: NodeId,
    /// `ln(discount * p)`: the occupancy factor of the edge.
    pub log_weight: f64,
    /// `log_weight + priority(next)`.
    pub score: f64,
}

/// Outcome ranking of one action by log-space priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Ranked {
    pub best: Option<RankedOutcome>,
    /// Score of the runner-up (negative infinity when there is none).
    pub second: f64,
}

/// Log-space priority of a node reached at `depth`: the log of its excess
/// width, capped by the best path score stored at its last backup. Negative
/// infinity once the excess width is gone (always at terminals).
pub(crate) fn priority_of<M: Model + ?Sized>(
    core: &SearchCore<'_, M>,
    id: NodeId,
    depth: u32,
) -> f64 {
    let excess = excess_width(core, id, depth);
    if excess <= 0.0 {
        return f64::NEG_INFINITY;
    }
    match core.node(id).aux {
        SearchAux::Priority { priority } => priority.min(excess.ln()),
        _ => excess.ln(),
    }
}

/// Score every outcome of `action` at a node on `depth` by
/// `ln(discount * p) + priority(next)`, successors taken one level deeper.
pub(crate) fn rank_outcomes<M: Model + ?Sized>(
    core: &SearchCore<'_, M>,
    id: NodeId,
    action: usize,
    depth: u32,
) -> Ranked {
    let discount = core.discount();
    let mut ranked = Ranked {
        best: None,
        second: f64::NEG_INFINITY,
    };
    let Some(entry) = core.node(id).q.get(action) else {
        return ranked;
    };
    for edge in &entry.outcomes {
        let log_weight = (discount * edge.prob).ln();
        let candidate = RankedOutcome {
            next: edge.next,
            log_weight,
            score: log_weight + priority_of(core, edge.next, depth + 1),
        };
        match ranked.best {
            Some(best) if candidate.score <= best.score => {
                ranked.second = ranked.second.max(candidate.score);
            }
            Some(best) => {
                ranked.second = best.score;
                ranked.best = Some(candidate);
            }
            None => ranked.best = Some(candidate),
        }
    }
    ranked
}

/// Re-rank the outcomes of `action` and store the node's priority: the best
/// outcome score, capped by the log of the node's own excess width.
pub(crate) fn refresh_priority<M: Model + ?Sized>(
    core: &mut SearchCore<'_, M>,
    id: NodeId,
    action: Option<usize>,
    depth: u32,
) -> Ranked {
    let ranked = match action {
        Some(a) => rank_outcomes(core, id, a, depth),
        None => Ranked {
            best: None,
            second: f64::NEG_INFINITY,
        },
    };
    let excess = excess_width(core, id, depth);
    let priority = if excess <= 0.0 {
        f64::NEG_INFINITY
    } else {
        ranked
            .best
            .map_or(excess.ln(), |best| best.score.min(excess.ln()))
    };
    core.node_mut(id).aux = SearchAux::Priority { priority };
    ranked
}

/// `width - precision / 2 * discount^-depth`; a branch with no excess width
/// cannot improve the root by more than the target precision.
pub(crate) fn excess_width<M: Model + ?Sized>(
    core: &SearchCore<'_, M>,
    id: NodeId,
    depth: u32,
) -> f64 {
    let node = core.node(id);
    if node.is_terminal {
        return f64::NEG_INFINITY;
    }
    let exponent = i32::try_from(depth).unwrap_or(i32::MAX);
    node.width() - 0.5 * core.target_precision() * core.discount().powi(-exponent)
}
