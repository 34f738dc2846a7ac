//! Solver configuration surface.
//!
//! [`SolverConfig`] carries every named option the search core consumes.
//! Callers either build it directly (struct update syntax over `default()`)
//! or apply named options from a JSON object with [`SolverConfig::from_json`].
//! [`SolverConfig::validate`] is the pre-flight check run before any bound is
//! constructed.

use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::error::SearchError;

/// How the alpha-vector lower bound is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBoundInit {
    /// Worst-case plane plus one converged plane per fixed action.
    Blind,
    /// A single plane at `min(minReward, 0) / (1 - discount)`.
    WorstCase,
}

/// How the sawtooth upper bound's corner vector is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpperBoundInit {
    /// Relaxed MDP value iteration refined by the fast informed bound.
    Fib,
    /// Relaxed MDP value iteration only.
    RelaxedMdp,
    /// The loose envelope `max(maxReward, 0) / (1 - discount)`.
    MaxReward,
}

impl LowerBoundInit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blind => "blind",
            Self::WorstCase => "worstCase",
        }
    }
}

impl UpperBoundInit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fib => "fib",
            Self::RelaxedMdp => "relaxedMdp",
            Self::MaxReward => "maxReward",
        }
    }
}

impl FromStr for LowerBoundInit {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blind" => Ok(Self::Blind),
            "worstCase" => Ok(Self::WorstCase),
            other => Err(SearchError::InvalidOption {
                name: "lowerBoundInit".into(),
                detail: format!("expected 'blind' or 'worstCase', got '{other}'"),
            }),
        }
    }
}

impl FromStr for UpperBoundInit {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fib" => Ok(Self::Fib),
            "relaxedMdp" => Ok(Self::RelaxedMdp),
            "maxReward" => Ok(Self::MaxReward),
            other => Err(SearchError::InvalidOption {
                name: "upperBoundInit".into(),
                detail: format!("expected 'fib', 'relaxedMdp' or 'maxReward', got '{other}'"),
            }),
        }
    }
}

/// Every option the search core and the bounds consume.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Stop once `root.upper - root.lower < target_precision`.
    pub target_precision: f64,
    /// Maintain a lower bound even when the algorithm does not require one.
    pub use_lower_bound: bool,
    /// Restrict sawtooth domination checks with the dimension -> witness index.
    pub use_sawtooth_support_list: bool,
    pub lower_bound_init: LowerBoundInit,
    pub upper_bound_init: UpperBoundInit,
    /// Hard recursion cap for every trial.
    pub max_trial_depth: u32,
    /// Starting depth limit of the focused (FRTDP) variant.
    pub initial_max_depth: u32,
    /// Multiplicative step for adaptive depth limits.
    pub depth_adjust_ratio: f64,
    /// Base quantile level of the adaptive (ARTDP) threshold trackers.
    pub artdp_quantile: f64,
    /// Samples kept per ARTDP tracker and trial.
    pub artdp_reservoir_size: usize,
    /// Wall-clock budget in seconds, checked between trials.
    pub max_time: Option<f64>,
    /// Trial budget.
    pub max_trials: Option<u64>,
    /// Seed for outcome sampling.
    pub seed: u64,
    /// Iteration cap for the one-time bound initializers.
    pub init_max_iterations: usize,
    /// Prune witnesses once their count grows by this factor...
    pub prune_growth_factor: f64,
    /// ...and by at least this many points since the last prune.
    pub prune_min_increment: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            target_precision: 1e-3,
            use_lower_bound: true,
            use_sawtooth_support_list: true,
            lower_bound_init: LowerBoundInit::Blind,
            upper_bound_init: UpperBoundInit::Fib,
            max_trial_depth: 1000,
            initial_max_depth: 10,
            depth_adjust_ratio: 1.1,
            artdp_quantile: 0.1,
            artdp_reservoir_size: 64,
            max_time: None,
            max_trials: None,
            seed: 0,
            init_max_iterations: 100_000,
            prune_growth_factor: 1.5,
            prune_min_increment: 10,
        }
    }
}

impl SolverConfig {
    /// Defaults overridden by the named options in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidOption`] if `options` is not an object
    /// or a value has the wrong type, [`SearchError::UnknownOption`] for
    /// names outside the surface, and any [`SolverConfig::validate`] error.
    pub fn from_json(options: &Value) -> Result<Self, SearchError> {
        let mut config = Self::default();
        config.apply_json(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply named options in place (no validation).
    ///
    /// # Errors
    ///
    /// See [`SolverConfig::from_json`].
    pub fn apply_json(&mut self, options: &Value) -> Result<(), SearchError> {
        let Value::Object(map) = options else {
            return Err(SearchError::InvalidOption {
                name: "<root>".into(),
                detail: "expected a JSON object of named options".into(),
            });
        };
        for (name, value) in map {
            self.apply_option(name, value)?;
        }
        Ok(())
    }

    fn apply_option(&mut self, name: &str, value: &Value) -> Result<(), SearchError> {
        match name {
            "targetPrecision" => self.target_precision = float(name, value)?,
            "useLowerBound" => self.use_lower_bound = boolean(name, value)?,
            "useSawtoothSupportList" => self.use_sawtooth_support_list = boolean(name, value)?,
            "lowerBoundInit" => self.lower_bound_init = string(name, value)?.parse()?,
            "upperBoundInit" => self.upper_bound_init = string(name, value)?.parse()?,
            "maxTrialDepth" => self.max_trial_depth = small_int(name, value)?,
            "initialMaxDepth" => self.initial_max_depth = small_int(name, value)?,
            "depthAdjustRatio" => self.depth_adjust_ratio = float(name, value)?,
            "artdpQuantile" => self.artdp_quantile = float(name, value)?,
            "artdpReservoirSize" => self.artdp_reservoir_size = size(name, value)?,
            "maxTime" => self.max_time = optional(value, |v| float(name, v))?,
            "maxTrials" => self.max_trials = optional(value, |v| integer(name, v))?,
            "seed" => self.seed = integer(name, value)?,
            "initMaxIterations" => self.init_max_iterations = size(name, value)?,
            "pruneGrowthFactor" => self.prune_growth_factor = float(name, value)?,
            "pruneMinIncrement" => self.prune_min_increment = size(name, value)?,
            other => {
                return Err(SearchError::UnknownOption {
                    name: other.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Pre-flight range checks.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.target_precision.is_finite() && self.target_precision > 0.0) {
            return Err(SearchError::invalid_config(format!(
                "targetPrecision must be positive and finite, got {}",
                self.target_precision
            )));
        }
        if self.max_trial_depth == 0 || self.initial_max_depth == 0 {
            return Err(SearchError::invalid_config(
                "maxTrialDepth and initialMaxDepth must be at least 1",
            ));
        }
        if !(self.depth_adjust_ratio.is_finite() && self.depth_adjust_ratio > 1.0) {
            return Err(SearchError::invalid_config(format!(
                "depthAdjustRatio must exceed 1, got {}",
                self.depth_adjust_ratio
            )));
        }
        if !(0.0..1.0).contains(&self.artdp_quantile) {
            return Err(SearchError::invalid_config(format!(
                "artdpQuantile must lie in [0, 1), got {}",
                self.artdp_quantile
            )));
        }
        if self.artdp_reservoir_size == 0 || self.init_max_iterations == 0 {
            return Err(SearchError::invalid_config(
                "artdpReservoirSize and initMaxIterations must be at least 1",
            ));
        }
        if !(self.prune_growth_factor.is_finite() && self.prune_growth_factor >= 1.0)
            || self.prune_min_increment == 0
        {
            return Err(SearchError::invalid_config(
                "pruneGrowthFactor must be >= 1 and pruneMinIncrement >= 1",
            ));
        }
        if let Some(t) = self.max_time {
            if !(t.is_finite() && t > 0.0) {
                return Err(SearchError::invalid_config(format!(
                    "maxTime must be positive and finite, got {t}"
                )));
            }
        }
        Ok(())
    }

    /// Named-option echo for run reports.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("targetPrecision".into(), json!(self.target_precision));
        map.insert("useLowerBound".into(), json!(self.use_lower_bound));
        map.insert(
            "useSawtoothSupportList".into(),
            json!(self.use_sawtooth_support_list),
        );
        map.insert("lowerBoundInit".into(), json!(self.lower_bound_init.as_str()));
        map.insert("upperBoundInit".into(), json!(self.upper_bound_init.as_str()));
        map.insert("maxTrialDepth".into(), json!(self.max_trial_depth));
        map.insert("initialMaxDepth".into(), json!(self.initial_max_depth));
        map.insert("depthAdjustRatio".into(), json!(self.depth_adjust_ratio));
        map.insert("artdpQuantile".into(), json!(self.artdp_quantile));
        map.insert("artdpReservoirSize".into(), json!(self.artdp_reservoir_size));
        map.insert("maxTime".into(), json!(self.max_time));
        map.insert("maxTrials".into(), json!(self.max_trials));
        map.insert("seed".into(), json!(self.seed));
        map.insert("initMaxIterations".into(), json!(self.init_max_iterations));
        map.insert("pruneGrowthFactor".into(), json!(self.prune_growth_factor));
        map.insert("pruneMinIncrement".into(), json!(self.prune_min_increment));
        Value::Object(map)
    }
}

fn type_error(name: &str, expected: &str, value: &Value) -> SearchError {
    SearchError::InvalidOption {
        name: name.to_string(),
        detail: format!("expected {expected}, got {value}"),
    }
}

fn float(name: &str, value: &Value) -> Result<f64, SearchError> {
    value
        .as_f64()
        .ok_or_else(|| type_error(name, "a number", value))
}

fn boolean(name: &str, value: &Value) -> Result<bool, SearchError> {
    value
        .as_bool()
        .ok_or_else(|| type_error(name, "a boolean", value))
}

fn string<'v>(name: &str, value: &'v Value) -> Result<&'v str, SearchError> {
    value
        .as_str()
        .ok_or_else(|| type_error(name, "a string", value))
}

fn integer(name: &str, value: &Value) -> Result<u64, SearchError> {
    value
        .as_u64()
        .ok_or_else(|| type_error(name, "a non-negative integer", value))
}

fn size(name: &str, value: &Value) -> Result<usize, SearchError> {
    usize::try_from(integer(name, value)?).map_err(|_| type_error(name, "a usize", value))
}

fn small_int(name: &str, value: &Value) -> Result<u32, SearchError> {
    u32::try_from(integer(name, value)?).map_err(|_| type_error(name, "a u32", value))
}

fn optional<T>(
    value: &Value,
    parse: impl FnOnce(&Value) -> Result<T, SearchError>,
) -> Result<Option<T>, SearchError> {
    if value.is_null() {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}
