//! Single Fehlberg 4(5) step
//!
//! [`fehl`] is stateless: it takes the current point and the derivative
//! already known there and returns the remaining five stage derivatives
//! together with the fifth-order solution at `t + h`. It never decides
//! anything; acceptance and step-size selection live in [`crate::Rkf45`].

use crate::coefficients::{
    ERROR_NUM, NODES, SOLUTION_DEN, SOLUTION_NUM, STAGE2_DEN, STAGE3_FRACTION, STAGE3_K2,
    STAGE3_NODE, STAGE4_DEN, STAGE4_NODE, STAGE4_NUM, STAGE5_DEN, STAGE5_NUM, STAGE6_DEN,
    STAGE6_NUM,
};
use crate::solver::OdeSystem;

/// Stage derivatives and solution produced by one Fehlberg step
#[derive(Debug, Clone, PartialEq)]
pub struct Stages<const N: usize> {
    /// Derivative at `t + h/4`
    pub f1: [f64; N],
    /// Derivative at `t + 3h/8`
    pub f2: [f64; N],
    /// Derivative at `t + 12h/13`
    pub f3: [f64; N],
    /// Derivative at `t + h`
    pub f4: [f64; N],
    /// Derivative at `t + h/2`, used only by the error estimate
    pub f5: [f64; N],
    /// Fifth-order solution at `t + h`
    pub s: [f64; N],
}

/// Take one Fehlberg step of size `h` from `(t, y)` where `yp = f(t, y)`.
///
/// Calls `sys.rhs` exactly five times. Non-finite values propagate.
#[allow(clippy::needless_range_loop)]
pub fn fehl<S: OdeSystem<N>, const N: usize>(
    sys: &S,
    y: &[f64; N],
    t: f64,
    h: f64,
    yp: &[f64; N],
) -> Stages<N> {
    let mut f1 = [0.0; N];
    let mut f2 = [0.0; N];
    let mut f3 = [0.0; N];
    let mut f4 = [0.0; N];
    let mut f5 = [0.0; N];
    let mut y_temp = [0.0; N];

    let ch = h / STAGE2_DEN;
    for i in 0..N {
        y_temp[i] = y[i] + ch * yp[i];
    }
    sys.rhs(t + ch, &y_temp, &mut f1);

    let ch = STAGE3_FRACTION[0] * h / STAGE3_FRACTION[1];
    for i in 0..N {
        y_temp[i] = y[i] + ch * (yp[i] + STAGE3_K2 * f1[i]);
    }
    sys.rhs(t + STAGE3_NODE[0] * h / STAGE3_NODE[1], &y_temp, &mut f2);

    let ch = h / STAGE4_DEN;
    for i in 0..N {
        y_temp[i] = y[i]
            + ch * (STAGE4_NUM[0] * yp[i] + (STAGE4_NUM[2] * f2[i] + STAGE4_NUM[1] * f1[i]));
    }
    sys.rhs(t + STAGE4_NODE[0] * h / STAGE4_NODE[1], &y_temp, &mut f3);

    let ch = h / STAGE5_DEN;
    for i in 0..N {
        y_temp[i] = y[i]
            + ch * ((STAGE5_NUM[0] * yp[i] + STAGE5_NUM[3] * f3[i])
                + (STAGE5_NUM[2] * f2[i] + STAGE5_NUM[1] * f1[i]));
    }
    sys.rhs(t + h, &y_temp, &mut f4);

    let ch = h / STAGE6_DEN;
    for i in 0..N {
        y_temp[i] = y[i]
            + ch * ((STAGE6_NUM[0] * yp[i] + (STAGE6_NUM[3] * f3[i] + STAGE6_NUM[4] * f4[i]))
                + (STAGE6_NUM[1] * f1[i] + STAGE6_NUM[2] * f2[i]));
    }
    sys.rhs(t + NODES[5] * h, &y_temp, &mut f5);

    let ch = h / SOLUTION_DEN;
    let mut s = [0.0; N];
    for i in 0..N {
        s[i] = y[i]
            + ch * ((SOLUTION_NUM[0] * yp[i]
                + (SOLUTION_NUM[3] * f3[i] + SOLUTION_NUM[4] * f4[i]))
                + (SOLUTION_NUM[2] * f2[i] + SOLUTION_NUM[5] * f5[i]));
    }

    Stages {
        f1,
        f2,
        f3,
        f4,
        f5,
        s,
    }
}

/// Largest ratio of unscaled local error to the mixed tolerance weight.
///
/// For each component, `ee = |(-2090 yp + (21970 f3 - 15048 f4)) + (22528 f2 - 27360 f5)|`
/// and `et = |y| + |s| + ae`, where `ae` is the absolute tolerance already
/// multiplied by `2 / relerr`. Returns `None` if any `et <= 0`, which
/// happens only when a component vanishes and `ae` is zero.
pub fn error_ratio<const N: usize>(
    stages: &Stages<N>,
    y: &[f64; N],
    yp: &[f64; N],
    ae: f64,
) -> Option<f64> {
    let mut eeoet: f64 = 0.0;

    for k in 0..N {
        let et = y[k].abs() + stages.s[k].abs() + ae;
        if et <= 0.0 {
            return None;
        }

        let ee = ((ERROR_NUM[0] * yp[k]
            + (ERROR_NUM[3] * stages.f3[k] + ERROR_NUM[4] * stages.f4[k]))
            + (ERROR_NUM[2] * stages.f2[k] + ERROR_NUM[5] * stages.f5[k]))
            .abs();

        eeoet = eeoet.max(ee / et);
    }

    Some(eeoet)
}
