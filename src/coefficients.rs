//! Runge-Kutta-Fehlberg 4(5) Coefficients
//!
//! Coefficients for the 6-stage embedded RK4(5) pair from:
//! Fehlberg, E. (1969). "Low-order classical Runge-Kutta formulas with
//! stepsize control and their application to some heat transfer problems"
//! NASA TR R-315, Table III.
//!
//! The constants are stored in the integer-scaled form used by the
//! Shampine-Watts RKF45 code: each stage is `y + (h / DEN) * (sum of
//! NUM[j] * k_j)`. Keeping the integers exact and grouping the sums the
//! same way in [`crate::step::fehl`] makes the single-step estimator
//! reproducible bit-for-bit.
//!
//! Stage derivatives are indexed `k1..k6`, where `k1 = f(t, y)` is the
//! derivative the caller already holds (`yp`) and is never re-evaluated.

/// Number of stages in the RKF45 method
pub const STAGES: usize = 6;

/// Derivative evaluations per trial step (`k1` is carried over from the last step)
pub const EVALS_PER_STEP: u64 = 5;

/// Order of the solution used to advance the integration
pub const ORDER: u8 = 5;

/// Order of the embedded method (used for error estimation)
pub const EMBEDDED_ORDER: u8 = 4;

/// Stage 2: `y + h/4 * k1` at `t + h/4`.
pub const STAGE2_DEN: f64 = 4.0;

/// Stage 3 step fraction `3/32`: `y + 3h/32 * (k1 + 3 k2)`.
pub const STAGE3_FRACTION: [f64; 2] = [3.0, 32.0];

/// Stage 3 weight of `k2` inside the parenthesis.
pub const STAGE3_K2: f64 = 3.0;

/// Stage 3 node `3/8`.
pub const STAGE3_NODE: [f64; 2] = [3.0, 8.0];

/// Stage 4: `y + h/2197 * (1932 k1 + (7296 k3 - 7200 k2))` at `t + 12h/13`.
pub const STAGE4_DEN: f64 = 2197.0;

/// Stage 4 numerators for `k1, k2, k3`.
pub const STAGE4_NUM: [f64; 3] = [1932.0, -7200.0, 7296.0];

/// Stage 4 node `12/13`.
pub const STAGE4_NODE: [f64; 2] = [12.0, 13.0];

/// Stage 5: `y + h/4104 * ((8341 k1 - 845 k4) + (29440 k3 - 32832 k2))` at `t + h`.
pub const STAGE5_DEN: f64 = 4104.0;

/// Stage 5 numerators for `k1, k2, k3, k4`.
pub const STAGE5_NUM: [f64; 4] = [8341.0, -32832.0, 29440.0, -845.0];

/// Stage 6: `y + h/20520 * ((-6080 k1 + (9295 k4 - 5643 k5)) + (41040 k2 - 28352 k3))`
/// at `t + h/2`.
pub const STAGE6_DEN: f64 = 20520.0;

/// Stage 6 numerators for `k1, k2, k3, k4, k5`.
pub const STAGE6_NUM: [f64; 5] = [-6080.0, 41040.0, -28352.0, 9295.0, -5643.0];

/// Fifth-order solution denominator.
pub const SOLUTION_DEN: f64 = 7_618_050.0;

/// Fifth-order solution numerators for `k1..k6`.
///
/// `s = y + h/7618050 * ((902880 k1 + (3855735 k4 - 1371249 k5)) + (3953664 k3 + 277020 k6))`
pub const SOLUTION_NUM: [f64; STAGES] = [
    902_880.0,
    0.0,
    3_953_664.0,
    3_855_735.0,
    -1_371_249.0,
    277_020.0,
];

/// Error estimate denominator.
pub const ERROR_DEN: f64 = 752_400.0;

/// Error estimate numerators for `k1..k6` (4th order minus 5th order weights, scaled).
///
/// `ee = |(-2090 k1 + (21970 k4 - 15048 k5)) + (22528 k3 - 27360 k6)|`
pub const ERROR_NUM: [f64; STAGES] = [-2090.0, 0.0, 22528.0, 21970.0, -15048.0, -27360.0];

/// Fourth-order (embedded) weights, kept for reference and checks.
///
/// From NASA TR R-315, Table III (c_k values)
pub const FOURTH_ORDER_WEIGHTS: [f64; STAGES] = [
    25.0 / 216.0,
    0.0,
    1408.0 / 2565.0,
    2197.0 / 4104.0,
    -1.0 / 5.0,
    0.0,
];

/// Stage nodes `c_i` as plain fractions of `h`.
pub const NODES: [f64; STAGES] = [0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0];

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-14;

    #[test]
    fn test_row_sums_match_nodes() {
        // Consistency: sum_j a_ij = c_i for every stage
        assert!((1.0 / STAGE2_DEN - NODES[1]).abs() < TOL);

        let row3 = STAGE3_FRACTION[0] / STAGE3_FRACTION[1] * (1.0 + STAGE3_K2);
        assert!((row3 - NODES[2]).abs() < TOL, "stage 3 row sums to {}", row3);
        assert!((STAGE3_NODE[0] / STAGE3_NODE[1] - NODES[2]).abs() < TOL);

        let row4: f64 = STAGE4_NUM.iter().sum::<f64>() / STAGE4_DEN;
        assert!((row4 - NODES[3]).abs() < TOL, "stage 4 row sums to {}", row4);
        assert!((STAGE4_NODE[0] / STAGE4_NODE[1] - NODES[3]).abs() < TOL);

        let row5: f64 = STAGE5_NUM.iter().sum::<f64>() / STAGE5_DEN;
        assert!((row5 - NODES[4]).abs() < TOL, "stage 5 row sums to {}", row5);

        let row6: f64 = STAGE6_NUM.iter().sum::<f64>() / STAGE6_DEN;
        assert!((row6 - NODES[5]).abs() < TOL, "stage 6 row sums to {}", row6);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let b_sum: f64 = SOLUTION_NUM.iter().sum::<f64>() / SOLUTION_DEN;
        assert!(
            (b_sum - 1.0).abs() < TOL,
            "5th order weights sum to {}, expected 1.0",
            b_sum
        );

        let b_hat_sum: f64 = FOURTH_ORDER_WEIGHTS.iter().sum();
        assert!(
            (b_hat_sum - 1.0).abs() < TOL,
            "4th order weights sum to {}, expected 1.0",
            b_hat_sum
        );
    }

    #[test]
    fn test_error_weights_sum_to_zero() {
        let err_sum: f64 = ERROR_NUM.iter().sum();
        assert_eq!(err_sum, 0.0, "Error weights sum to {}, expected 0.0", err_sum);
    }

    #[test]
    fn test_error_weights_are_embedded_difference() {
        for i in 0..STAGES {
            let b5 = SOLUTION_NUM[i] / SOLUTION_DEN;
            let expected = (FOURTH_ORDER_WEIGHTS[i] - b5) * ERROR_DEN;
            assert!(
                (expected - ERROR_NUM[i]).abs() < 1e-8,
                "error weight {} is {}, expected {}",
                i,
                ERROR_NUM[i],
                expected
            );
        }
    }

    #[test]
    fn test_specific_coefficients() {
        assert!((SOLUTION_NUM[0] / SOLUTION_DEN - 16.0 / 135.0).abs() < TOL);
        assert!((SOLUTION_NUM[2] / SOLUTION_DEN - 6656.0 / 12825.0).abs() < TOL);
        assert!((SOLUTION_NUM[3] / SOLUTION_DEN - 28561.0 / 56430.0).abs() < TOL);
        assert!((SOLUTION_NUM[4] / SOLUTION_DEN - (-9.0 / 50.0)).abs() < TOL);
        assert!((SOLUTION_NUM[5] / SOLUTION_DEN - 2.0 / 55.0).abs() < TOL);

        assert!((STAGE5_NUM[0] / STAGE5_DEN - 439.0 / 216.0).abs() < TOL);
        assert!((STAGE5_NUM[1] / STAGE5_DEN - (-8.0)).abs() < TOL);
        assert!((STAGE6_NUM[1] / STAGE6_DEN - 2.0).abs() < TOL);
    }
}
