//! Horizon Kernel: numeric carrier and tabular decision models.
//!
//! # API Surface
//!
//! - [`vector::SparseVector`] -- states and beliefs
//! - [`matrix::SparseMatrix`] -- per-action transition and observation tables
//! - [`hash::state_fingerprint`] -- canonical dedup key for a state vector
//! - [`pomdp::TabularPomdp`] -- flat POMDP (or fully observable MDP) with
//!   belief prediction and Bayesian update
//!
//! # Module Dependency Direction
//!
//! `vector` ← `matrix` ← `pomdp`, and `vector` ← `hash`.
//!
//! One-way only. No cycles.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod hash;
pub mod matrix;
pub mod pomdp;
pub mod vector;
