//! End-to-end behavior of integration sessions through the public API.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use rkf45::{
    Mode, OdeSystem, Outcome, Resume, Rkf45, SolverConfig, SolverError, State, Status, Tolerances,
};
use std::cell::Cell;
use std::f64::consts::PI;

/// y' = 0.25 y (1 - y/20), counting calls
struct Logistic {
    calls: Cell<u64>,
}

impl Logistic {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl OdeSystem<1> for Logistic {
    fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
        self.calls.set(self.calls.get() + 1);
        dydt[0] = 0.25 * y[0] * (1.0 - y[0] / 20.0);
    }
}

fn logistic_exact(t: f64) -> f64 {
    20.0 / (1.0 + 19.0 * (-0.25 * t).exp())
}

fn oscillator(_t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
    dydt[0] = y[1];
    dydt[1] = -y[0];
}

#[test]
fn logistic_checkpoints_match_closed_form() {
    let sys = Logistic::new();
    let mut solver = Rkf45::new(Tolerances::new(1e-8, 1e-8));
    let mut state = State::new(0.0, [1.0]);

    let mut resume = Resume::Start;
    for i in 1..=10 {
        let tout = 3.0 * i as f64;
        let outcome = solver.advance(&sys, &mut state, tout, resume).unwrap();
        assert_eq!(outcome, Outcome::ReachedTarget);
        assert_eq!(solver.status(), Some(Status::ReachedTarget));
        assert_relative_eq!(state.y[0], logistic_exact(tout), max_relative = 1e-6);
        resume = Resume::Continue;
    }
}

#[test]
fn counter_matches_actual_evaluations() {
    let sys = Logistic::new();
    let mut solver = Rkf45::new(Tolerances::new(1e-7, 1e-7));
    solver.integrate(&sys, 0.0, &[1.0], 25.0).unwrap();
    assert_eq!(solver.evaluations(), sys.calls.get());
    assert_eq!(solver.stats.fn_evals, sys.calls.get());
    let trials = solver.stats.accepted_steps + solver.stats.rejected_steps;
    assert_eq!(solver.stats.fn_evals, 1 + 5 * trials + solver.stats.accepted_steps);
}

#[test]
fn requery_costs_nothing() {
    let sys = Logistic::new();
    let mut solver = Rkf45::new(Tolerances::new(1e-6, 1e-6));
    let mut state = State::new(0.0, [1.0]);
    solver.advance(&sys, &mut state, 5.0, Resume::Start).unwrap();

    let calls = sys.calls.get();
    for _ in 0..3 {
        let outcome = solver.advance(&sys, &mut state, 5.0, Resume::Continue).unwrap();
        assert_eq!(outcome, Outcome::ReachedTarget);
    }
    assert_eq!(sys.calls.get(), calls);
}

#[test]
fn first_call_at_output_time_only_evaluates_derivative() {
    let sys = Logistic::new();
    let mut solver = Rkf45::new(Tolerances::new(1e-6, 1e-6));
    let mut state = State::new(2.0, [4.0]);
    let outcome = solver.advance(&sys, &mut state, 2.0, Resume::Start).unwrap();

    assert_eq!(outcome, Outcome::ReachedTarget);
    assert_eq!(sys.calls.get(), 1);
    assert_eq!(state.t, 2.0);
    assert_eq!(state.y, [4.0]);
    assert_abs_diff_eq!(state.yp[0], 0.25 * 4.0 * 0.8, epsilon = 1e-15);
}

#[test]
fn oscillator_returns_after_one_period() {
    let mut solver = Rkf45::new(Tolerances::new(1e-10, 1e-10));
    let outputs: Vec<f64> = (1..=12).map(|i| 2.0 * PI * i as f64 / 12.0).collect();
    let trajectory = solver.solve_at(&oscillator, 0.0, &[1.0, 0.0], &outputs).unwrap();

    let end = trajectory.last().unwrap();
    assert_eq!(end.t, 2.0 * PI);
    assert_abs_diff_eq!(end.y[0], 1.0, epsilon = 1e-7);
    assert_abs_diff_eq!(end.y[1], 0.0, epsilon = 1e-7);
}

#[test]
fn step_changes_are_bounded() {
    let mut solver = Rkf45::new(Tolerances::new(1e-9, 1e-9));
    solver.set_mode(Mode::SingleStep);
    let mut state = State::new(0.0, [1.0, 0.0]);

    let mut resume = Resume::Start;
    let mut proposed: Option<f64> = None;
    loop {
        let t_before = state.t;
        let outcome = solver.advance(&oscillator, &mut state, 20.0, resume).unwrap();
        resume = Resume::Continue;

        let taken = state.t - t_before;
        assert!(taken > 0.0);
        if let Some(h) = proposed {
            // never longer than proposed
            assert!(taken <= h * (1.0 + 1e-12));
        }

        // the next proposal grows by at most a factor of five
        let next = solver.step_size().unwrap();
        assert!(next <= 5.0 * taken * (1.0 + 1e-12), "{} after {}", next, taken);
        proposed = Some(next);

        if outcome == Outcome::ReachedTarget {
            break;
        }
    }
    assert_eq!(state.t, 20.0);
}

#[test]
fn budget_never_exceeded() {
    for max_evaluations in [6, 7, 50, 333] {
        let config = SolverConfig {
            max_evaluations,
            ..Default::default()
        };
        let sys = Logistic::new();
        let mut solver = Rkf45::with_config(Tolerances::new(1e-11, 1e-11), config).unwrap();
        let mut state = State::new(0.0, [1.0]);

        let err = solver.advance(&sys, &mut state, 1000.0, Resume::Start).unwrap_err();
        assert!(matches!(err, SolverError::TooManyEvaluations { .. }));
        assert!(sys.calls.get() <= max_evaluations);
        assert_eq!(err.status(), Some(Status::TooManyEvaluations));
        assert!(err.is_recoverable());
    }
}

#[test]
fn budget_covers_extrapolation_to_close_output() {
    let config = SolverConfig {
        max_evaluations: 7,
        ..Default::default()
    };
    let still = |_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = 0.0;
    let calls = Cell::new(0u64);
    let counted = |t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| {
        calls.set(calls.get() + 1);
        still(t, y, dydt);
    };
    let mut solver = Rkf45::with_config(Tolerances::new(1e-6, 1e-6), config).unwrap();
    let t0 = 1.0e6;
    let mut state = State::new(t0, [1.0]);

    // one full step uses up the whole budget
    let outcome = solver.advance(&counted, &mut state, t0 + 1.0, Resume::Start).unwrap();
    assert_eq!(outcome, Outcome::ReachedTarget);
    assert_eq!(calls.get(), 7);

    // the next output is close enough to extrapolate, but that still costs an evaluation
    let tout = t0 + 1.0 + 1e-9;
    let err = solver.advance(&counted, &mut state, tout, Resume::Continue).unwrap_err();
    assert!(matches!(err, SolverError::TooManyEvaluations { evaluations: 7 }));
    assert_eq!(calls.get(), 7);
    assert_eq!(state.t, t0 + 1.0);

    let outcome = solver
        .advance(&counted, &mut state, tout, Resume::ResetEvaluations)
        .unwrap();
    assert_eq!(outcome, Outcome::ReachedTarget);
    assert_eq!(state.t, tout);
    assert_eq!(calls.get(), 8);
    assert_eq!(solver.evaluations(), 1);
}

#[test]
fn budget_reset_completes_integration() {
    let config = SolverConfig {
        max_evaluations: 200,
        ..Default::default()
    };
    let sys = Logistic::new();
    let mut solver = Rkf45::with_config(Tolerances::new(1e-10, 1e-10), config).unwrap();
    let mut state = State::new(0.0, [1.0]);

    let mut resume = Resume::Start;
    let mut resets = 0;
    loop {
        match solver.advance(&sys, &mut state, 30.0, resume) {
            Ok(Outcome::ReachedTarget) => break,
            Ok(Outcome::Continuing) => unreachable!("normal mode"),
            Err(SolverError::TooManyEvaluations { .. }) => {
                resets += 1;
                resume = Resume::ResetEvaluations;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert!(resets < 100);
    }

    assert!(resets > 0);
    assert_relative_eq!(state.y[0], logistic_exact(30.0), max_relative = 1e-8);
}

#[test]
fn backward_and_forward_sessions_are_independent() {
    let mut forward = Rkf45::new(Tolerances::new(1e-9, 1e-9));
    let mut backward = Rkf45::new(Tolerances::new(1e-9, 1e-9));
    let mut f = State::new(0.0, [1.0, 0.0]);
    let mut b = State::new(0.0, [1.0, 0.0]);

    let mut resume = Resume::Start;
    for i in 1..=6 {
        let tout = 0.5 * i as f64;
        forward.advance(&oscillator, &mut f, tout, resume).unwrap();
        backward.advance(&oscillator, &mut b, -tout, resume).unwrap();
        resume = Resume::Continue;

        assert!(forward.step_size().unwrap() > 0.0);
        assert!(backward.step_size().unwrap() < 0.0);
        // cos is even, sin is odd
        assert_abs_diff_eq!(f.y[0], b.y[0], epsilon = 1e-7);
        assert_abs_diff_eq!(f.y[1], -b.y[1], epsilon = 1e-7);
    }
}

#[test]
fn recoverable_errors_expose_flags() {
    let still = |_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = 0.0;
    let mut solver = Rkf45::new(Tolerances::new(1e-6, 0.0));
    let mut state = State::new(0.0, [0.0]);

    let err = solver.advance(&still, &mut state, 1.0, Resume::Start).unwrap_err();
    assert_eq!(err.status().map(Status::flag), Some(5));
    assert_eq!(solver.status(), Some(Status::SolutionVanished));

    let err = solver.advance(&still, &mut state, 1.0, Resume::Continue).unwrap_err();
    assert!(!err.is_recoverable());
    assert_eq!(err.status(), None);
    assert_eq!(solver.status(), Some(Status::SolutionVanished));
}
