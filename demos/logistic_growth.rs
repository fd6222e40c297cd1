//! Logistic growth with output checkpoints.
//!
//! y' = 0.25 y (1 - y/20), y(0) = 1 has the closed form
//! y(t) = 20 / (1 + 19 e^(-t/4)).
//!
//! Run with:
//!   cargo run --example logistic_growth

use rkf45::{Rkf45, Tolerances};

fn main() {
    let logistic = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| {
        dydt[0] = 0.25 * y[0] * (1.0 - y[0] / 20.0);
    };
    let exact = |t: f64| 20.0 / (1.0 + 19.0 * (-0.25 * t).exp());

    let outputs: Vec<f64> = (0..=10).map(|i| 2.0 * i as f64).collect();

    println!("Logistic growth, carrying capacity 20");
    for &tol in &[1e-4, 1e-6, 1e-8] {
        let mut solver = Rkf45::new(Tolerances::new(tol, tol));
        let trajectory = match solver.solve_at(&logistic, 0.0, &[1.0], &outputs) {
            Ok(trajectory) => trajectory,
            Err(e) => {
                eprintln!("tol = {tol:e}: {e}");
                continue;
            }
        };

        let max_error = trajectory
            .iter()
            .map(|s| (s.y[0] - exact(s.t)).abs())
            .fold(0.0, f64::max);

        println!();
        println!("  tol = {tol:e}");
        for s in trajectory.iter().step_by(2) {
            println!("    t = {:5.1}  y = {:12.8}  exact = {:12.8}", s.t, s.y[0], exact(s.t));
        }
        println!(
            "    max error {:.2e}, {} evaluations, {} accepted / {} rejected steps",
            max_error,
            solver.stats.fn_evals,
            solver.stats.accepted_steps,
            solver.stats.rejected_steps
        );
    }
}
