//! How a solve ended, and its JSON report.

use serde_json::{json, Value};

use crate::progress::SearchStats;

/// Why the solver stopped issuing trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Root interval narrower than the target precision.
    Converged,
    /// The variant's own labeling marked the root solved.
    RootSolved,
    /// `maxTime` elapsed.
    TimeBudgetExceeded,
    /// `maxTrials` trials ran.
    TrialBudgetExceeded,
}

impl TerminationReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::RootSolved => "root_solved",
            Self::TimeBudgetExceeded => "time_budget_exceeded",
            Self::TrialBudgetExceeded => "trial_budget_exceeded",
        }
    }

    /// Converged or solved, as opposed to stopped by a budget.
    #[must_use]
    pub fn is_converged(self) -> bool {
        matches!(self, Self::Converged | Self::RootSolved)
    }
}

/// Final state of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub termination: TerminationReason,
    pub lower: f64,
    pub upper: f64,
    pub stats: SearchStats,
    pub elapsed_secs: f64,
}

impl SolveOutcome {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Non-finite bounds (no lower bound maintained) serialize as `null`.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "backups": self.stats.backups,
            "elapsed_secs": self.elapsed_secs,
            "lower": self.lower,
            "states_expanded": self.stats.states_expanded,
            "states_touched": self.stats.states_touched,
            "termination": self.termination.as_str(),
            "trials": self.stats.trials,
            "upper": self.upper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_names_the_termination_reason() {
        let outcome = SolveOutcome {
            termination: TerminationReason::TrialBudgetExceeded,
            lower: f64::NEG_INFINITY,
            upper: 3.0,
            stats: SearchStats {
                trials: 7,
                ..SearchStats::default()
            },
            elapsed_secs: 0.25,
        };
        let v = outcome.to_json_value();
        assert_eq!(v["termination"], "trial_budget_exceeded");
        assert_eq!(v["trials"], 7);
        assert!(v["lower"].is_null());
        assert!(!outcome.termination.is_converged());
        assert!(TerminationReason::RootSolved.is_converged());
    }
}
