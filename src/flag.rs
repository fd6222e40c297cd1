//! Classic integer-flag interface
//!
//! Mirrors the calling convention of the Shampine-Watts RKF45 routine:
//! state, derivative, time and relative tolerance are updated in place
//! and the returned integer is both the status of this call and, passed
//! back unchanged, the command for the next one.
//!
//! | flag | on input | on output |
//! |------|----------|-----------|
//! | 1 / -1 | start a session (normal / single-step) | |
//! | 2 / -2 | continue (normal / single-step) | output time reached / one step taken |
//! | 3 | accept the raised `relerr` | `relerr` was too small and has been raised |
//! | 4 | reset the evaluation budget | evaluation budget exhausted |
//! | 5 | continue with `abserr > 0` | solution vanished with `abserr == 0` |
//! | 6 | | accuracy unachievable; loosen a tolerance and pass 2 |
//! | 7 | | output requested too often; pass 2 to go on |
//! | 8 | | invalid input |
//!
//! Passing 6, 7 or 8 back in is a misuse: the call fails with
//! [`SolverError::ResumeRefused`] instead of returning a flag.

use crate::error::{Result, SolverError};
use crate::solver::{OdeSystem, Rkf45, State, Tolerances};
use crate::status::{Mode, Outcome, Resume, Status};

/// One classic RKF45 call.
///
/// `relerr` is written back because the solver may raise it (flag 3).
/// Returns the new flag; `Err` only for refused resumptions.
///
/// # Example
/// ```ignore
/// let mut flag = 1;
/// for i in 1..=4 {
///     flag = rkf45(&mut solver, &sys, &mut y, &mut yp, &mut t, i as f64, &mut relerr, abserr, flag)?;
///     assert_eq!(flag, 2);
/// }
/// ```
#[allow(clippy::too_many_arguments)]
pub fn rkf45<S: OdeSystem<N>, const N: usize>(
    solver: &mut Rkf45<N>,
    sys: &S,
    y: &mut [f64; N],
    yp: &mut [f64; N],
    t: &mut f64,
    tout: f64,
    relerr: &mut f64,
    abserr: f64,
    flag: i32,
) -> Result<i32> {
    let resume = match flag {
        1 | -1 => Resume::Start,
        2 | -2 => Resume::Continue,
        3 => Resume::AcceptRelErr,
        4 => Resume::ResetEvaluations,
        5 => Resume::RetryWithAbsErr,
        6..=8 => {
            return Err(SolverError::refused(format!(
                "flag {} must be answered before integration continues",
                flag
            )))
        }
        _ => return Ok(Status::InvalidInput.flag()),
    };

    if flag < 0 {
        solver.set_mode(Mode::SingleStep);
    } else if flag <= 2 {
        solver.set_mode(Mode::Normal);
    }
    solver.set_tolerances(Tolerances::new(*relerr, abserr));

    let mut state = State {
        t: *t,
        y: *y,
        yp: *yp,
    };
    let result = solver.advance(sys, &mut state, tout, resume);

    *t = state.t;
    *y = state.y;
    *yp = state.yp;
    *relerr = solver.tolerances().relerr;

    match result {
        Ok(Outcome::ReachedTarget) => Ok(Status::ReachedTarget.flag()),
        Ok(Outcome::Continuing) => Ok(Status::Continuing.flag()),
        Err(e) => match e.status() {
            Some(status) => Ok(status.flag()),
            None => Err(e),
        },
    }
}
