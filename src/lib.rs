//! # RKF45: Runge-Kutta-Fehlberg 4(5) Integrator
//!
//! An adaptive ODE integrator for non-stiff initial value problems, after
//! the classic Shampine-Watts RKF45 code.
//!
//! ## Features
//!
//! - 6-stage embedded RK4(5) pair, fifth-order solution with a fourth-order
//!   error estimate
//! - Mixed relative/absolute error control with adaptive step size
//! - Resumable sessions: each [`Rkf45`] owns its own counters and step
//!   size, so any number of integrations can run side by side
//! - Normal and single-step modes
//! - **Event finding** with Brent's method on the Hermite interpolant of
//!   each step
//! - The classic integer-flag calling convention in [`flag`]
//!
//! ## Basic Usage
//!
//! ```rust
//! use rkf45::{OdeSystem, Outcome, Resume, Rkf45, State, Tolerances};
//!
//! // Logistic growth toward a carrying capacity of 20
//! struct Logistic;
//!
//! impl OdeSystem<1> for Logistic {
//!     fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
//!         dydt[0] = 0.25 * y[0] * (1.0 - y[0] / 20.0);
//!     }
//! }
//!
//! let mut solver = Rkf45::new(Tolerances::new(1e-8, 1e-8));
//! let mut state = State::new(0.0, [1.0]);
//!
//! let mut resume = Resume::Start;
//! for i in 1..=4 {
//!     let tout = 5.0 * i as f64;
//!     let outcome = solver.advance(&Logistic, &mut state, tout, resume).unwrap();
//!     assert_eq!(outcome, Outcome::ReachedTarget);
//!     resume = Resume::Continue;
//! }
//!
//! let exact = 20.0 / (1.0 + 19.0 * (-5.0_f64).exp());
//! assert!((state.y[0] - exact).abs() < 1e-6);
//! ```
//!
//! ## Recovering From Failures
//!
//! Failures come back as [`SolverError`]. The recoverable ones leave the
//! session intact; answer them with the matching [`Resume`] variant on the
//! next call:
//!
//! ```rust
//! use rkf45::{Resume, Rkf45, SolverError, State, Tolerances};
//!
//! let decay = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = -y[0];
//! let mut solver = Rkf45::new(Tolerances::new(0.0, 1e-10));
//! let mut state = State::new(0.0, [1.0]);
//!
//! match solver.advance(&decay, &mut state, 1.0, Resume::Start) {
//!     Err(SolverError::RelErrTooSmall { adjusted, .. }) => {
//!         assert_eq!(solver.tolerances().relerr, adjusted);
//!         solver.advance(&decay, &mut state, 1.0, Resume::AcceptRelErr).unwrap();
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! assert!((state.y[0] - (-1.0_f64).exp()).abs() < 1e-9);
//! ```
//!
//! ## Event Finding
//!
//! The integrator can detect when a user-defined event function crosses
//! zero and stop at that point:
//!
//! ```rust
//! use rkf45::{EventConfig, EventDirection, IntegrationResult, Rkf45, Tolerances};
//!
//! let oscillator = |_t: f64, y: &[f64; 2], dydt: &mut [f64; 2]| {
//!     dydt[0] = y[1];
//!     dydt[1] = -y[0];
//! };
//! // y = cos t falls through 0.5 at t = π/3
//! let event = |_t: f64, y: &[f64; 2]| y[0] - 0.5;
//! let config = EventConfig {
//!     direction: EventDirection::Falling,
//!     ..Default::default()
//! };
//!
//! let mut solver = Rkf45::new(Tolerances::new(1e-10, 1e-10));
//! match solver.integrate_to_event(&oscillator, &event, &config, 0.0, &[1.0, 0.0], 10.0) {
//!     Ok(IntegrationResult::Event(ev)) => {
//!         assert!((ev.t - std::f64::consts::FRAC_PI_3).abs() < 1e-6);
//!     }
//!     other => panic!("expected an event, got {:?}", other),
//! }
//! ```
//!
//! ## Tolerance Selection
//!
//! The local error of each component is kept below
//! `relerr * |y| + abserr`. A pure relative test (`abserr = 0`) fails with
//! [`SolverError::SolutionVanished`] when a component becomes exactly
//! zero. `relerr` is never allowed below `2 * EPSILON + 1e-12`
//! (see [`SolverConfig::relerr_floor`]).
//!
//! ## Logging
//!
//! Session starts, initial step estimates and error returns are logged
//! at `debug` level through the [`log`] facade; every trial step is
//! logged at `trace`. No logger is installed by the library.
//!
//! ## References
//!
//! 1. Fehlberg, E. (1969). "Low-order Classical Runge-Kutta Formulas with
//!    Stepsize Control and their Application to some Heat Transfer
//!    Problems". NASA TR R-315.
//!
//! 2. Shampine, L.F., Watts, H.A. (1976). "Practical Solution of
//!    Ordinary Differential Equations by Runge-Kutta Methods".
//!    Sandia Laboratories report SAND76-0585.
//!
//! 3. Forsythe, G.E., Malcolm, M.A., Moler, C.B. (1977). "Computer
//!    Methods for Mathematical Computations". Prentice-Hall.
//!
//! 4. Brent, R.P. (1973). "Algorithms for Minimization without
//!    Derivatives". Prentice-Hall.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod config;
pub mod error;
pub mod events;
pub mod flag;
pub mod solver;
pub mod status;
pub mod step;

pub use config::{SolverConfig, StepController};
pub use error::{Result, SolverError};
pub use events::{
    BrentError, BrentSolver, EventAction, EventConfig, EventDirection, EventFunction, EventResult,
};
pub use solver::{IntegrationResult, OdeSystem, Rkf45, State, Stats, Tolerances};
pub use status::{Mode, Outcome, Resume, Status};
