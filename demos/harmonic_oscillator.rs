//! Basic RKF45 usage: harmonic oscillator.
//!
//! Integrates y'' + y = 0 over one period in twelve output steps and
//! compares each output with the exact solution.
//!
//! Run with:
//!   cargo run --example harmonic_oscillator

use rkf45::{OdeSystem, Resume, Rkf45, State, Tolerances};

/// Simple harmonic oscillator: y'' + ω²y = 0
///
/// State vector: [y, y']
struct HarmonicOscillator {
    omega: f64,
}

impl OdeSystem<2> for HarmonicOscillator {
    fn rhs(&self, _t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
        dydt[0] = y[1];
        dydt[1] = -self.omega * self.omega * y[0];
    }
}

fn main() {
    let sys = HarmonicOscillator { omega: 1.0 };
    let period = 2.0 * std::f64::consts::PI;

    let tol = Tolerances::new(1e-9, 1e-9);
    let mut solver = Rkf45::new(tol);
    let mut state = State::new(0.0, [1.0, 0.0]);

    println!("Harmonic Oscillator (ω = 1), 12 outputs over one period");
    println!();
    println!("      t            y              y'           |error|");

    let mut resume = Resume::Start;
    for i in 1..=12 {
        let tout = period * i as f64 / 12.0;
        if let Err(e) = solver.advance(&sys, &mut state, tout, resume) {
            eprintln!("integration failed: {e}");
            return;
        }
        resume = Resume::Continue;

        // Exact solution: y(t) = cos t, y'(t) = -sin t
        let error = (state.y[0] - tout.cos())
            .abs()
            .max((state.y[1] + tout.sin()).abs());
        println!(
            "  {:8.5}  {:14.10}  {:14.10}  {:.2e}",
            state.t, state.y[0], state.y[1], error
        );
    }

    println!();
    println!("  Accepted steps: {}", solver.stats.accepted_steps);
    println!("  Rejected steps: {}", solver.stats.rejected_steps);
    println!("  Function evals: {}", solver.stats.fn_evals);
}
