//! Binary that solves a fixture world and prints deterministic output
//! lines for cross-process verification.
//!
//! Usage: `solve_fixture <world> <algorithm> [config.json]`
//!
//! Output: key=value lines, wall-clock fields excluded.

use std::path::Path;
use std::process::ExitCode;

use horizon_harness::{init_tracing, load_config, run_world};
use horizon_search::{Algorithm, SolverConfig};

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: solve_fixture <world> <algorithm> [config.json]");
        return ExitCode::from(2);
    }
    let algorithm: Algorithm = match args[1].parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    let config = match args.get(2) {
        Some(path) => match load_config(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        },
        None => SolverConfig::default(),
    };

    let report = match run_world(&args[0], algorithm, config, None) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = &report.outcome;
    println!("report_digest={}", report.digest().as_str());
    println!("algorithm={}", report.algorithm);
    println!("termination_reason={}", outcome.termination.as_str());
    println!("lower={}", outcome.lower);
    println!("upper={}", outcome.upper);
    println!("trials={}", outcome.stats.trials);
    println!("backups={}", outcome.stats.backups);
    println!("states_touched={}", outcome.stats.states_touched);
    match report.root_action {
        Some(a) => println!("root_action={a}"),
        None => println!("root_action=none"),
    }
    ExitCode::SUCCESS
}
