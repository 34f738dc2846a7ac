//! Per-trial progress snapshots and the sinks that record them.

use std::io::Write;

use tracing::debug;

use crate::error::SearchError;

/// Lines closer together than this factor of elapsed time are skipped.
pub const LOG_THROTTLE_FACTOR: f64 = 1.01;

/// Counters maintained by the search core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Distinct states created in the graph.
    pub states_touched: u64,
    /// States whose actions were materialized.
    pub states_expanded: u64,
    pub trials: u64,
    /// Node backups performed (one per node update, both sides together).
    pub backups: u64,
}

/// Root interval and counters after a trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed_secs: f64,
    pub lower: f64,
    pub upper: f64,
    pub stats: SearchStats,
}

impl ProgressSnapshot {
    /// `elapsedSeconds lowerBound upperBound statesTouched statesExpanded trialCount backupCount`
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.elapsed_secs,
            self.lower,
            self.upper,
            self.stats.states_touched,
            self.stats.states_expanded,
            self.stats.trials,
            self.stats.backups
        )
    }
}

/// Logging capability injected into a solver.
pub trait ProgressSink {
    /// Called after every trial.
    ///
    /// # Errors
    ///
    /// [`SearchError::ProgressLog`] when the snapshot cannot be written.
    fn record(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SearchError>;

    /// Called once when a solve ends, with the final snapshot.
    ///
    /// # Errors
    ///
    /// [`SearchError::ProgressLog`] when the snapshot cannot be written.
    fn finish(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SearchError> {
        let _ = snapshot;
        Ok(())
    }
}

/// Emits one `debug!` event per trial.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn record(&mut self, s: &ProgressSnapshot) -> Result<(), SearchError> {
        debug!(
            elapsed_secs = s.elapsed_secs,
            lower = s.lower,
            upper = s.upper,
            states_touched = s.stats.states_touched,
            states_expanded = s.stats.states_expanded,
            trials = s.stats.trials,
            backups = s.stats.backups,
            "trial finished"
        );
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn record(&mut self, _: &ProgressSnapshot) -> Result<(), SearchError> {
        Ok(())
    }
}

/// Line-oriented bounds log with elapsed-time throttling.
#[derive(Debug)]
pub struct BoundsLog<W: Write> {
    out: W,
    last_elapsed: Option<f64>,
    last_trials: Option<u64>,
}

impl<W: Write> BoundsLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_elapsed: None,
            last_trials: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SearchError> {
        writeln!(self.out, "{}", snapshot.to_line()).map_err(log_error)?;
        self.last_elapsed = Some(snapshot.elapsed_secs);
        self.last_trials = Some(snapshot.stats.trials);
        Ok(())
    }
}

fn log_error(err: std::io::Error) -> SearchError {
    SearchError::ProgressLog {
        detail: err.to_string(),
    }
}

impl<W: Write> ProgressSink for BoundsLog<W> {
    fn record(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SearchError> {
        match self.last_elapsed {
            Some(last) if snapshot.elapsed_secs < last * LOG_THROTTLE_FACTOR => Ok(()),
            _ => self.write(snapshot),
        }
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) -> Result<(), SearchError> {
        if self.last_trials != Some(snapshot.stats.trials) {
            self.write(snapshot)?;
        }
        self.out.flush().map_err(log_error)
    }
}
