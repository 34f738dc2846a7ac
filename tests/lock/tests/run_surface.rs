//! Harness surface: config files, bounds logs, reports and pre-flight
//! configuration errors.

use std::io::Write;

use horizon_harness::worlds::{discounted_cycle, slippery_corridor, World};
use horizon_harness::{load_config, run, run_world, RunError};
use horizon_search::{Algorithm, SearchError, Solver, SolverConfig};

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write config");
    file
}

#[test]
fn config_file_drives_a_run() {
    let file = write_config(r#"{"maxTrials": 3, "upperBoundInit": "maxReward", "lowerBoundInit": "worstCase"}"#);
    let config = load_config(file.path()).expect("config loads");
    let report = run_world("slippery_corridor", Algorithm::Rtdp, config, None).expect("run");
    assert_eq!(report.outcome.stats.trials, 3);
    let v = report.to_json_value();
    assert_eq!(v["config"]["maxTrials"], 3);
    assert_eq!(v["config"]["upperBoundInit"], "maxReward");
    assert_eq!(v["outcome"]["termination"], "trial_budget_exceeded");
}

#[test]
fn bounds_log_ends_with_the_final_snapshot() {
    let model = slippery_corridor::model().expect("corridor builds");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bounds.log");
    let config = SolverConfig {
        max_trials: Some(25),
        upper_bound_init: horizon_search::UpperBoundInit::MaxReward,
        lower_bound_init: horizon_search::LowerBoundInit::WorstCase,
        ..SolverConfig::default()
    };
    let report = run(&model, Algorithm::Frtdp, config, Some(&path)).expect("run");

    let text = std::fs::read_to_string(&path).expect("log readable");
    let lines: Vec<&str> = text.lines().collect();
    assert!(!lines.is_empty());
    for line in &lines {
        assert_eq!(line.split(' ').count(), 7, "malformed line {line:?}");
    }
    let last: Vec<&str> = lines[lines.len() - 1].split(' ').collect();
    let upper: f64 = last[2].parse().expect("upper");
    let trials: u64 = last[5].parse().expect("trials");
    assert_eq!(trials, report.outcome.stats.trials);
    assert_eq!(upper, report.outcome.upper);

    let mut trial_counts = lines.iter().map(|l| {
        l.split(' ')
            .nth(5)
            .and_then(|t| t.parse::<u64>().ok())
            .expect("trial count")
    });
    let mut prev = trial_counts.next().expect("first line");
    for t in trial_counts {
        assert!(t > prev, "trial counts not increasing");
        prev = t;
    }
}

#[test]
fn unwritable_bounds_log_is_an_io_error() {
    let model = discounted_cycle::model().expect("cycle builds");
    let path = std::path::Path::new("/nonexistent/horizon/bounds.log");
    let err = run(&model, Algorithm::Lrtdp, SolverConfig::default(), Some(path)).unwrap_err();
    assert!(matches!(err, RunError::Io { .. }), "{err}");
}

#[test]
fn algorithms_that_need_a_lower_bound_reject_running_without_one() {
    let model = discounted_cycle::model().expect("cycle builds");
    let config = SolverConfig {
        use_lower_bound: false,
        max_trials: Some(10),
        ..SolverConfig::default()
    };
    for algorithm in [Algorithm::Frtdp, Algorithm::Artdp] {
        let mut solver = Solver::new(&model, algorithm, config.clone());
        let err = solver.solve().unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig { .. }), "{algorithm}: {err}");
    }
}

#[test]
fn unbudgeted_rtdp_without_a_lower_bound_is_rejected() {
    let model = discounted_cycle::model().expect("cycle builds");
    let config = SolverConfig {
        use_lower_bound: false,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(&model, Algorithm::Rtdp, config.clone());
    assert!(matches!(
        solver.initialize(),
        Err(SearchError::InvalidConfig { .. })
    ));

    let budgeted = SolverConfig {
        max_trials: Some(5),
        ..config
    };
    let mut solver = Solver::new(&model, Algorithm::Rtdp, budgeted);
    let outcome = solver.solve().expect("budgeted run");
    assert_eq!(outcome.stats.trials, 5);
    assert!(outcome.to_json_value()["lower"].is_null());
}

#[test]
fn queries_before_initialize_fail() {
    let model = discounted_cycle::model().expect("cycle builds");
    let solver = Solver::new(&model, Algorithm::Hdp, SolverConfig::default());
    assert!(solver.root_interval().is_err());
    assert!(solver.choose_action(model.initial_belief()).is_err());
    assert_eq!(solver.stats(), horizon_search::SearchStats::default());
}

#[test]
fn every_world_solves_under_a_small_budget() {
    for world in World::ALL {
        let config = SolverConfig {
            max_trials: Some(5),
            max_trial_depth: 50,
            ..SolverConfig::default()
        };
        let report = run_world(world.as_str(), Algorithm::Lrtdp, config, None)
            .unwrap_or_else(|e| panic!("{world}: {e}"));
        assert!(report.outcome.lower <= report.outcome.upper, "{world}");
        assert!(report.root_action.is_some(), "{world}");
    }
}
