//! Invariants of the state graph and its bounds under search.
//!
//! - Admissibility: every node's interval brackets the exact value.
//! - Monotonicity: trials never raise an upper bound or lower a lower bound.
//! - Dedup: one node per distinct state.

use std::collections::BTreeSet;

use horizon_harness::worlds::{slippery_corridor, tiger};
use horizon_kernel::vector::SparseVector;
use horizon_search::{Algorithm, Solver, SolverConfig};

/// Exact corridor values under the always-right policy, which is optimal.
fn corridor_values() -> Vec<f64> {
    let (p, g) = (slippery_corridor::SUCCESS, slippery_corridor::DISCOUNT);
    let mut v = vec![0.0; slippery_corridor::LENGTH];
    for cell in (0..slippery_corridor::goal()).rev() {
        v[cell] = (-1.0 + g * p * v[cell + 1]) / (1.0 - g * (1.0 - p));
    }
    v
}

fn loose_config() -> SolverConfig {
    SolverConfig {
        upper_bound_init: horizon_search::UpperBoundInit::MaxReward,
        lower_bound_init: horizon_search::LowerBoundInit::WorstCase,
        max_trials: Some(30),
        max_trial_depth: 30,
        ..SolverConfig::default()
    }
}

#[test]
fn corridor_nodes_bracket_exact_values_during_search() {
    let model = slippery_corridor::model().expect("corridor builds");
    let exact = corridor_values();
    for algorithm in Algorithm::ALL {
        let mut solver = Solver::new(&model, algorithm, loose_config());
        for _ in 0..30 {
            solver.run_trial().expect("trial");
            let core = solver.core().expect("initialized");
            for (id, node) in core.graph().iter() {
                let s = node.state.unit_index().expect("MDP states are basis vectors");
                assert!(
                    node.lower <= exact[s] + 1e-6 && exact[s] - 1e-6 <= node.upper,
                    "{algorithm} node {id} (cell {s}) [{}, {}] misses {}",
                    node.lower,
                    node.upper,
                    exact[s]
                );
            }
        }
    }
}

#[test]
fn trials_only_tighten_node_intervals() {
    let model = tiger::model().expect("tiger builds");
    for algorithm in Algorithm::ALL {
        let mut solver = Solver::new(&model, algorithm, loose_config());
        let mut previous: Vec<(f64, f64)> = Vec::new();
        for _ in 0..15 {
            solver.run_trial().expect("trial");
            let core = solver.core().expect("initialized");
            let current: Vec<(f64, f64)> =
                core.graph().iter().map(|(_, n)| (n.lower, n.upper)).collect();
            for (i, (&(lo0, up0), &(lo1, up1))) in previous.iter().zip(&current).enumerate() {
                let slack = 1e-6 * (1.0 + up0.abs().max(lo0.abs()));
                assert!(up1 <= up0 + slack, "{algorithm} node {i} upper rose {up0} -> {up1}");
                assert!(lo1 >= lo0 - slack, "{algorithm} node {i} lower fell {lo0} -> {lo1}");
                assert!(lo1 <= up1, "{algorithm} node {i} crossed [{lo1}, {up1}]");
            }
            previous = current;
        }
    }
}

#[test]
fn each_state_has_exactly_one_node() {
    let model = slippery_corridor::model().expect("corridor builds");
    let mut solver = Solver::new(&model, Algorithm::Lrtdp, loose_config());
    solver.solve().expect("solve");
    let core = solver.core().expect("initialized");
    let graph = core.graph();
    assert!(graph.len() <= slippery_corridor::LENGTH);

    let fingerprints: BTreeSet<_> = graph.iter().map(|(_, n)| n.fingerprint.clone()).collect();
    assert_eq!(fingerprints.len(), graph.len());

    for (id, node) in graph.iter() {
        assert_eq!(graph.lookup(&node.state), Some(id));
    }
    let unseen = SparseVector::from_dense(&[0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(graph.lookup(&unseen), None);
}

#[test]
fn repeated_get_node_returns_the_same_id() {
    let model = slippery_corridor::model().expect("corridor builds");
    let mut core = horizon_search::engine::SearchCore::new(&model, SolverConfig::default())
        .expect("core builds");
    let before = core.graph().len();
    let a = core
        .get_node(SparseVector::unit(slippery_corridor::LENGTH, 3))
        .expect("get_node");
    let b = core
        .get_node(SparseVector::unit(slippery_corridor::LENGTH, 3))
        .expect("get_node");
    assert_eq!(a, b);
    assert_eq!(core.graph().len(), before + 1);

    let root = core.root();
    let again = core
        .get_node(SparseVector::unit(slippery_corridor::LENGTH, 0))
        .expect("get_node");
    assert_eq!(again, root);
}
