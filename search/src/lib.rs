//! Horizon Search: anytime bounded-RTDP planning over MDPs and POMDPs.
//!
//! This crate provides the search layer. It depends only on
//! `horizon_kernel`; it does NOT depend on `horizon_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! horizon_kernel  ←  horizon_search  ←  horizon_harness
//! (vectors, model)   (cache, bounds,     (worlds, runner, config files)
//!                     search variants)
//! ```
//!
//! # Key types
//!
//! - [`Model`] -- decision process contract consumed by the search
//! - [`StateGraph`] -- deduplicating node arena with lazy expansion
//! - [`SawtoothUpperBound`] / [`MaxPlanesLowerBound`] -- the value bounds
//! - [`Solver`] -- lifecycle and top-level stop rule around a
//!   [`TrialStrategy`] (RTDP, LRTDP, HDP, FRTDP, ARTDP)
//! - [`SolverConfig`] -- named options with defaults and validation
//! - [`ProgressSink`] -- per-trial snapshot logging capability

#![forbid(unsafe_code)]

pub mod bounds;
pub mod cache;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod node;
pub mod outcome;
pub mod progress;
pub mod search;
pub mod tabular;
pub mod variants;

pub use bounds::planes::MaxPlanesLowerBound;
pub use bounds::sawtooth::SawtoothUpperBound;
pub use bounds::{BoundPair, LowerBound, UpperBound, ValueBound};
pub use cache::StateGraph;
pub use config::{LowerBoundInit, SolverConfig, UpperBoundInit};
pub use contract::Model;
pub use error::SearchError;
pub use outcome::{SolveOutcome, TerminationReason};
pub use progress::{BoundsLog, NullSink, ProgressSink, ProgressSnapshot, SearchStats, TracingSink};
pub use search::{Algorithm, Phase, Solver};
pub use variants::TrialStrategy;
