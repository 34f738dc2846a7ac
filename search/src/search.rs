//! Solver lifecycle: initialization, trials and the top-level stop rule.

use std::fmt;
use std::str::FromStr;

use horizon_kernel::vector::SparseVector;
use tracing::{info, info_span, Span};

use crate::config::SolverConfig;
use crate::contract::Model;
use crate::engine::SearchCore;
use crate::error::SearchError;
use crate::outcome::{SolveOutcome, TerminationReason};
use crate::progress::{ProgressSink, ProgressSnapshot, SearchStats, TracingSink};
use crate::variants::{Artdp, Frtdp, Hdp, Lrtdp, Rtdp, TrialStrategy};

/// The five trial-based variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Rtdp,
    Lrtdp,
    Hdp,
    Frtdp,
    Artdp,
}

impl Algorithm {
    pub const ALL: [Self; 5] = [Self::Rtdp, Self::Lrtdp, Self::Hdp, Self::Frtdp, Self::Artdp];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rtdp => "rtdp",
            Self::Lrtdp => "lrtdp",
            Self::Hdp => "hdp",
            Self::Frtdp => "frtdp",
            Self::Artdp => "artdp",
        }
    }

    fn strategy<'m, M: Model + ?Sized>(
        self,
        config: &SolverConfig,
    ) -> Box<dyn TrialStrategy<M> + 'm> {
        match self {
            Self::Rtdp => Box::new(Rtdp),
            Self::Lrtdp => Box::new(Lrtdp),
            Self::Hdp => Box::new(Hdp::new()),
            Self::Frtdp => Box::new(Frtdp::new(config)),
            Self::Artdp => Box::new(Artdp::new(config)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| SearchError::InvalidOption {
                name: "algorithm".into(),
                detail: format!("unknown algorithm '{s}'"),
            })
    }
}

/// Run state of a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// Bounds built and root fetched; no trial has run yet.
    Initializing,
    Trialing,
    Converged,
}

/// Anytime planner over one model.
///
/// `solve` always runs at least one trial. Between trials it stops when the
/// root interval is narrower than the target precision, when the variant
/// has labeled the root solved, or when a budget runs out; a trial, once
/// started, always runs to completion.
pub struct Solver<'m, M: Model + ?Sized> {
    model: &'m M,
    algorithm: Algorithm,
    config: SolverConfig,
    strategy: Box<dyn TrialStrategy<M> + 'm>,
    sink: Box<dyn ProgressSink + 'm>,
    core: Option<SearchCore<'m, M>>,
    phase: Phase,
    span: Span,
}

impl<'m, M: Model + ?Sized> Solver<'m, M> {
    #[must_use]
    pub fn new(model: &'m M, algorithm: Algorithm, config: SolverConfig) -> Self {
        let span = info_span!("solver", algorithm = algorithm.as_str());
        Self {
            model,
            algorithm,
            strategy: algorithm.strategy(&config),
            config,
            sink: Box::new(TracingSink),
            core: None,
            phase: Phase::Uninitialized,
            span,
        }
    }

    /// Replace the default [`TracingSink`].
    #[must_use]
    pub fn with_sink(mut self, sink: impl ProgressSink + 'm) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Search state, once initialized.
    #[must_use]
    pub fn core(&self) -> Option<&SearchCore<'m, M>> {
        self.core.as_ref()
    }

    /// Validate the configuration against the algorithm, build the bounds
    /// and fetch the root. A no-op after the first call.
    ///
    /// # Errors
    ///
    /// Configuration, missing-bound and bound initialization failures.
    pub fn initialize(&mut self) -> Result<(), SearchError> {
        if self.core.is_some() {
            return Ok(());
        }
        let span = self.span.clone();
        let _guard = span.enter();
        self.config.validate()?;
        if self.strategy.requires_lower_bound() && !self.config.use_lower_bound {
            return Err(SearchError::invalid_config(format!(
                "{} requires a lower bound (useLowerBound)",
                self.algorithm
            )));
        }
        if !self.config.use_lower_bound
            && !self.strategy.labels_solved()
            && self.config.max_trials.is_none()
            && self.config.max_time.is_none()
        {
            return Err(SearchError::invalid_config(format!(
                "{} without a lower bound never converges; set maxTrials or maxTime",
                self.algorithm
            )));
        }
        let core = SearchCore::new(self.model, self.config.clone())?;
        self.core = Some(core);
        self.phase = Phase::Initializing;
        Ok(())
    }

    fn core_ref(&self) -> Result<&SearchCore<'m, M>, SearchError> {
        self.core.as_ref().ok_or_else(not_initialized)
    }

    /// Run one trial (initializing first if needed) and record a snapshot.
    ///
    /// # Errors
    ///
    /// Initialization failures, fatal consistency failures and sink errors.
    pub fn run_trial(&mut self) -> Result<ProgressSnapshot, SearchError> {
        let span = self.span.clone();
        let _guard = span.enter();
        self.initialize()?;
        let Some(core) = self.core.as_mut() else {
            return Err(not_initialized());
        };
        self.strategy.run_trial(core)?;
        core.count_trial();
        let snapshot = core.snapshot();
        self.sink.record(&snapshot)?;
        self.phase = if self.convergence().is_some() {
            Phase::Converged
        } else {
            Phase::Trialing
        };
        Ok(snapshot)
    }

    fn convergence(&self) -> Option<TerminationReason> {
        let core = self.core.as_ref()?;
        let (lower, upper) = core.root_interval();
        if upper - lower < self.config.target_precision {
            Some(TerminationReason::Converged)
        } else if self.strategy.root_solved(core) {
            Some(TerminationReason::RootSolved)
        } else {
            None
        }
    }

    fn budget_exhausted(&self, core: &SearchCore<'m, M>) -> Option<TerminationReason> {
        if let Some(max) = self.config.max_trials {
            if core.stats().trials >= max {
                return Some(TerminationReason::TrialBudgetExceeded);
            }
        }
        if let Some(max) = self.config.max_time {
            if core.elapsed_secs() >= max {
                return Some(TerminationReason::TimeBudgetExceeded);
            }
        }
        None
    }

    /// Run trials until converged or out of budget.
    ///
    /// # Errors
    ///
    /// Initialization failures, fatal consistency failures and sink errors.
    /// Budget exhaustion is reported in the outcome, not as an error.
    pub fn solve(&mut self) -> Result<SolveOutcome, SearchError> {
        let span = self.span.clone();
        let _guard = span.enter();
        self.initialize()?;
        let termination = loop {
            if self.phase != Phase::Converged {
                self.run_trial()?;
            }
            if let Some(reason) = self.convergence() {
                break reason;
            }
            let core = self.core_ref()?;
            if let Some(reason) = self.budget_exhausted(core) {
                break reason;
            }
        };
        let core = self.core_ref()?;
        let snapshot = core.snapshot();
        let outcome = SolveOutcome {
            termination,
            lower: snapshot.lower,
            upper: snapshot.upper,
            stats: snapshot.stats,
            elapsed_secs: snapshot.elapsed_secs,
        };
        self.sink.finish(&snapshot)?;
        info!(
            termination = termination.as_str(),
            lower = outcome.lower,
            upper = outcome.upper,
            trials = outcome.stats.trials,
            "solve finished"
        );
        Ok(outcome)
    }

    /// Counters so far (all zero before initialization).
    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.core
            .as_ref()
            .map_or_else(SearchStats::default, |core| core.stats())
    }

    /// Current `[lower, upper]` at the root.
    ///
    /// # Errors
    ///
    /// The solver has not been initialized.
    pub fn root_interval(&self) -> Result<(f64, f64), SearchError> {
        Ok(self.core_ref()?.root_interval())
    }

    /// Action to execute at `state`; never mutates the search.
    ///
    /// # Errors
    ///
    /// The solver has not been initialized, or bound evaluation failed.
    pub fn choose_action(&self, state: &SparseVector) -> Result<Option<usize>, SearchError> {
        self.core_ref()?.choose_action(state)
    }

    /// `[lower, upper]` at `state`; unvisited states get fresh bound values.
    ///
    /// # Errors
    ///
    /// The solver has not been initialized, or bound evaluation failed.
    pub fn value_at(&self, state: &SparseVector) -> Result<(f64, f64), SearchError> {
        self.core_ref()?.peek_interval(state)
    }
}

fn not_initialized() -> SearchError {
    SearchError::BoundInitialization {
        detail: "solver used before initialize".into(),
    }
}
