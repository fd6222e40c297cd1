//! The classic integer-flag calling convention.
//!
//! Drives a problem with a pole through the flag interface and answers
//! each status the way a classic caller would.
//!
//! Run with:
//!   cargo run --example flag_protocol

use rkf45::flag::rkf45;
use rkf45::{Rkf45, Tolerances};

fn main() {
    // y' = y², y(0) = 1: y = 1/(1 - t), singular at t = 1
    let blowup = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = y[0] * y[0];

    let mut relerr = 0.0;
    let abserr = 1e-10;
    let mut solver = Rkf45::new(Tolerances::new(relerr, abserr));
    let (mut y, mut yp, mut t) = ([1.0], [0.0], 0.0);

    println!("Flag protocol on y' = y², pole at t = 1");

    let mut flag = 1;
    for i in 1..=10 {
        let tout = 0.1 * i as f64 + 0.05;
        loop {
            flag = match rkf45(
                &mut solver, &blowup, &mut y, &mut yp, &mut t, tout, &mut relerr, abserr, flag,
            ) {
                Ok(flag) => flag,
                Err(e) => {
                    println!("  hard stop: {e}");
                    return;
                }
            };
            match flag {
                2 => {
                    println!("  flag 2  t = {:5.2}  y = {:.10e}", t, y[0]);
                    break;
                }
                3 => println!("  flag 3  relerr raised to {relerr:e}, retrying"),
                4 => println!("  flag 4  evaluation budget exhausted, resetting"),
                6 => {
                    println!("  flag 6  accuracy unachievable at t = {t:.15}, y = {:.3e}", y[0]);
                    return;
                }
                other => {
                    println!("  flag {other}, giving up");
                    return;
                }
            }
        }
    }
}
