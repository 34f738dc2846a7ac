//! End-to-end convergence of every algorithm on the fixture worlds.

use horizon_harness::worlds::{slippery_corridor, tiger};
use horizon_search::{
    Algorithm, LowerBoundInit, Solver, SolverConfig, TerminationReason, UpperBoundInit,
};

fn corridor_start_value() -> f64 {
    let (p, g) = (slippery_corridor::SUCCESS, slippery_corridor::DISCOUNT);
    let mut v = 0.0;
    for _ in 0..slippery_corridor::goal() {
        v = (-1.0 + g * p * v) / (1.0 - g * (1.0 - p));
    }
    v
}

fn assert_brackets(algorithm: Algorithm, lower: f64, upper: f64, exact: f64, precision: f64) {
    assert!(
        lower <= exact + 1e-6 && exact - 1e-6 <= upper,
        "{algorithm}: [{lower}, {upper}] misses {exact}"
    );
    assert!(upper - lower <= precision, "{algorithm}: width {}", upper - lower);
}

#[test]
fn corridor_converges_from_default_bounds() {
    let model = slippery_corridor::model().expect("corridor builds");
    let exact = corridor_start_value();
    for algorithm in Algorithm::ALL {
        let config = SolverConfig::default();
        let mut solver = Solver::new(&model, algorithm, config.clone());
        let outcome = solver.solve().expect("solve");
        assert!(outcome.termination.is_converged(), "{algorithm}");
        assert_brackets(algorithm, outcome.lower, outcome.upper, exact, config.target_precision);
        let action = solver
            .choose_action(model.initial_belief())
            .expect("choose_action");
        assert_eq!(action, Some(slippery_corridor::RIGHT), "{algorithm}");
    }
}

#[test]
fn corridor_converges_from_loose_bounds() {
    let model = slippery_corridor::model().expect("corridor builds");
    let exact = corridor_start_value();
    for algorithm in [
        Algorithm::Rtdp,
        Algorithm::Lrtdp,
        Algorithm::Hdp,
        Algorithm::Frtdp,
        Algorithm::Artdp,
    ] {
        let config = SolverConfig {
            upper_bound_init: UpperBoundInit::MaxReward,
            lower_bound_init: LowerBoundInit::WorstCase,
            max_trials: Some(20_000),
            ..SolverConfig::default()
        };
        let mut solver = Solver::new(&model, algorithm, config.clone());
        let outcome = solver.solve().expect("solve");
        assert!(
            outcome.termination.is_converged(),
            "{algorithm} stopped with {}",
            outcome.termination.as_str()
        );
        assert_brackets(algorithm, outcome.lower, outcome.upper, exact, config.target_precision);
        assert!(outcome.stats.trials > 1, "{algorithm} had nothing to do");
    }
}

#[test]
fn labeling_algorithms_converge_without_a_lower_bound() {
    let model = slippery_corridor::model().expect("corridor builds");
    let exact = corridor_start_value();
    for algorithm in [Algorithm::Lrtdp, Algorithm::Hdp] {
        let config = SolverConfig {
            use_lower_bound: false,
            upper_bound_init: UpperBoundInit::MaxReward,
            ..SolverConfig::default()
        };
        let mut solver = Solver::new(&model, algorithm, config);
        let outcome = solver.solve().expect("solve");
        assert_eq!(outcome.termination, TerminationReason::RootSolved, "{algorithm}");
        assert!(outcome.lower.is_infinite() && outcome.lower < 0.0);
        assert!(
            (outcome.upper - exact).abs() < 0.1,
            "{algorithm}: upper {} vs {exact}",
            outcome.upper
        );
    }
}

#[test]
fn tiger_gap_shrinks_with_more_trials() {
    let model = tiger::model().expect("tiger builds");
    for algorithm in Algorithm::ALL {
        let width_after = |trials: u64| {
            let config = SolverConfig {
                max_trials: Some(trials),
                max_trial_depth: 40,
                ..SolverConfig::default()
            };
            let mut solver = Solver::new(&model, algorithm, config);
            let outcome = solver.solve().expect("solve");
            assert!(outcome.lower <= outcome.upper, "{algorithm} crossed");
            outcome.width()
        };
        let short = width_after(1);
        let long = width_after(40);
        assert!(
            long <= short,
            "{algorithm}: width grew from {short} to {long}"
        );
    }
}

#[test]
fn tiger_converges_for_every_algorithm() {
    let model = tiger::model().expect("tiger builds");
    for algorithm in Algorithm::ALL {
        let config = SolverConfig {
            target_precision: 0.1,
            max_trial_depth: 60,
            max_trials: Some(50_000),
            ..SolverConfig::default()
        };
        let mut solver = Solver::new(&model, algorithm, config);
        let outcome = solver.solve().expect("solve");
        assert_eq!(
            outcome.termination,
            TerminationReason::Converged,
            "{algorithm} stopped after {} trials at width {}",
            outcome.stats.trials,
            outcome.width()
        );
        assert!(outcome.lower <= outcome.upper, "{algorithm} crossed");
        assert!(outcome.width() <= 0.1, "{algorithm}: width {}", outcome.width());
    }
}

#[test]
fn artdp_keeps_tightening_tiger_past_its_first_thresholds() {
    let model = tiger::model().expect("tiger builds");
    let width_after = |trials: u64| {
        let config = SolverConfig {
            target_precision: 0.1,
            max_trial_depth: 60,
            max_trials: Some(trials),
            ..SolverConfig::default()
        };
        let mut solver = Solver::new(&model, Algorithm::Artdp, config);
        solver.solve().expect("solve").width()
    };
    let early = width_after(20);
    let late = width_after(400);
    assert!(
        late < early || late <= 0.1,
        "width stuck at {early} -> {late}"
    );
}

#[test]
fn tiger_policy_listens_first() {
    let model = tiger::model().expect("tiger builds");
    let config = SolverConfig {
        max_trials: Some(60),
        max_trial_depth: 40,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(&model, Algorithm::Frtdp, config);
    solver.solve().expect("solve");
    let action = solver
        .choose_action(model.initial_belief())
        .expect("choose_action");
    assert_eq!(action, Some(tiger::LISTEN));
}
