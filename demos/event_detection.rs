//! Event detection: threshold and zero crossings.
//!
//! Demonstrates both `EventAction::Stop` (halt when a logistic population
//! reaches half its capacity) and `EventAction::Continue` (collect every
//! zero crossing of an oscillator).
//!
//! Run with:
//!   cargo run --example event_detection

use rkf45::{
    EventAction, EventConfig, EventDirection, EventFunction, IntegrationResult, OdeSystem, Rkf45,
    Tolerances,
};

/// Logistic growth y' = r y (1 - y/K)
struct Logistic {
    rate: f64,
    capacity: f64,
}

impl OdeSystem<1> for Logistic {
    fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
        dydt[0] = self.rate * y[0] * (1.0 - y[0] / self.capacity);
    }
}

/// Population crossing a fixed level
struct Threshold {
    level: f64,
}

impl EventFunction<1> for Threshold {
    fn eval(&self, _t: f64, y: &[f64; 1]) -> f64 {
        y[0] - self.level
    }
}

fn main() {
    // --- Part 1: stop when the population reaches K/2 ---
    // Exact: y = K / (1 + 19 e^(-rt)) = K/2 at t = ln(19) / r
    let sys = Logistic {
        rate: 0.25,
        capacity: 20.0,
    };
    let event = Threshold { level: 10.0 };
    let config = EventConfig {
        direction: EventDirection::Rising,
        ..Default::default()
    };

    let mut solver = Rkf45::new(Tolerances::new(1e-10, 1e-10));
    let expected = 19.0_f64.ln() / 0.25;

    println!("Event Detection");
    println!();
    match solver.integrate_to_event(&sys, &event, &config, 0.0, &[1.0], 40.0) {
        Ok(IntegrationResult::Event(ev)) => {
            println!("Part 1: EventAction::Stop");
            println!("  Half capacity at t = {:.10}  (expected: {:.10})", ev.t, expected);
            println!("  Time error: {:.2e}", (ev.t - expected).abs());
            println!("  y at event: {:.12}", ev.y[0]);
            println!("  Brent iterations: {}", ev.iterations);
        }
        Ok(IntegrationResult::Completed { t, .. }) => {
            println!("Part 1: No crossing found (reached t = {t})");
        }
        Err(e) => println!("Part 1 failed: {e}"),
    }

    println!();

    // --- Part 2: collect every zero crossing of cos t over five periods ---
    let oscillator = |_t: f64, y: &[f64; 2], dydt: &mut [f64; 2]| {
        dydt[0] = y[1];
        dydt[1] = -y[0];
    };
    let zero = |_t: f64, y: &[f64; 2]| y[0];
    let config_continue = EventConfig {
        action: EventAction::Continue,
        ..Default::default()
    };

    let tf = 10.0 * std::f64::consts::PI;
    let mut solver2 = Rkf45::new(Tolerances::new(1e-10, 1e-10));
    if let Err(e) =
        solver2.integrate_to_event(&oscillator, &zero, &config_continue, 0.0, &[1.0, 0.0], tf)
    {
        println!("Part 2 failed: {e}");
        return;
    }

    println!("Part 2: EventAction::Continue (5 periods)");
    println!("  Found {} zero crossings:", solver2.collected_events.len());
    for (i, ev) in solver2.collected_events.iter().enumerate() {
        let exact = std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::PI;
        println!(
            "    #{:2}: t = {:10.6}  err = {:.2e}",
            i + 1,
            ev.t,
            (ev.t - exact).abs()
        );
    }
}
