//! Horizon Harness: fixture worlds and run orchestration for the planner.
//!
//! The harness builds models, loads solver configuration, drives
//! `horizon_search` and packages the result as a JSON report. It does NOT
//! implement search logic; it delegates to the search crate.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod runner;
pub mod worlds;

pub use config::load_config;
pub use runner::{run, run_world, RunError, RunReport};

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `warn`),
/// writing to stderr. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init();
}
