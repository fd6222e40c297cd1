//! Event Finding for ODE Integration
//!
//! An event function `g(t, y)` is monitored after every accepted step.
//! When `g` changes sign, Brent's method locates the crossing time on the
//! cubic Hermite interpolant built from the `(t, y, yp)` records at both
//! ends of the step. The RKF45 session already holds `yp` at every accepted
//! point, so locating an event costs no extra derivative evaluations.
//!
//! Typical uses:
//!
//! - Threshold crossings (population reaches a level, temperature limit)
//! - Turning points (velocity component = 0)
//! - Phase crossings of oscillators

use thiserror::Error;

/// Event function trait
///
/// # Example
///
/// ```ignore
/// // Detect when the population reaches half its carrying capacity
/// struct HalfCapacity {
///     capacity: f64,
/// }
///
/// impl EventFunction<1> for HalfCapacity {
///     fn eval(&self, _t: f64, y: &[f64; 1]) -> f64 {
///         y[0] - 0.5 * self.capacity
///     }
/// }
/// ```
pub trait EventFunction<const N: usize> {
    /// Evaluate the event function; a zero crossing is an event.
    fn eval(&self, t: f64, y: &[f64; N]) -> f64;
}

impl<F, const N: usize> EventFunction<N> for F
where
    F: Fn(f64, &[f64; N]) -> f64,
{
    fn eval(&self, t: f64, y: &[f64; N]) -> f64 {
        self(t, y)
    }
}

/// Direction of zero-crossing to detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventDirection {
    /// g goes from negative to positive
    Rising,
    /// g goes from positive to negative
    Falling,
    /// Any zero crossing
    #[default]
    Any,
}

/// Action to take when an event is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventAction {
    /// Stop integration at this event
    #[default]
    Stop,
    /// Record the event in `Rkf45::collected_events` and keep integrating
    Continue,
}

/// Configuration for an event
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventConfig {
    /// Which direction of zero-crossing to detect
    pub direction: EventDirection,
    /// What to do when the event is detected
    pub action: EventAction,
    /// Tolerance on the event time (default: 1e-12)
    pub root_tol: f64,
    /// Maximum iterations for root finding (default: 50)
    pub max_iter: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            direction: EventDirection::Any,
            action: EventAction::Stop,
            root_tol: 1e-12,
            max_iter: 50,
        }
    }
}

/// A located event
#[derive(Debug, Clone, PartialEq)]
pub struct EventResult<const N: usize> {
    /// Time at which the event occurred
    pub t: f64,
    /// Interpolated state at the event
    pub y: [f64; N],
    /// Value of the event function at the event (should be ~0)
    pub g_value: f64,
    /// Number of root-finding iterations used
    pub iterations: usize,
}

/// Root returned by [`BrentSolver::find_root`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    /// Abscissa of the root
    pub x: f64,
    /// Function value at `x`
    pub fx: f64,
    /// Iterations used
    pub iterations: usize,
}

/// Brent's method for root finding
///
/// Combines bisection, the secant method and inverse quadratic
/// interpolation; never leaves the bracket.
///
/// Reference: Brent, R.P. (1973). "Algorithms for Minimization without
/// Derivatives". Prentice-Hall.
#[derive(Debug, Clone)]
pub struct BrentSolver {
    /// Convergence tolerance on the bracket width
    pub tol: f64,
    /// Maximum iterations
    pub max_iter: usize,
}

impl Default for BrentSolver {
    fn default() -> Self {
        Self {
            tol: 1e-12,
            max_iter: 50,
        }
    }
}

impl BrentSolver {
    /// Create a new Brent solver with specified tolerance
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self { tol, max_iter }
    }

    /// Find a root of `f` in `[a, b]`.
    ///
    /// `fa` and `fb` may be passed when already known; they must have
    /// opposite signs (or one of them be zero).
    pub fn find_root<F>(
        &self,
        mut f: F,
        mut a: f64,
        mut b: f64,
        fa: Option<f64>,
        fb: Option<f64>,
    ) -> Result<Root, BrentError>
    where
        F: FnMut(f64) -> f64,
    {
        let mut fa = fa.unwrap_or_else(|| f(a));
        let mut fb = fb.unwrap_or_else(|| f(b));

        if fa * fb > 0.0 {
            return Err(BrentError::NotBracketed { a, b, fa, fb });
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut c = a;
        let mut fc = fa;
        let mut bisected = true;
        // step before last
        let mut d = b - a;

        for iter in 0..self.max_iter {
            // b holds the best estimate
            if fa.abs() < fb.abs() {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut fa, &mut fb);
            }

            if fb == 0.0 || (b - a).abs() <= self.tol {
                return Ok(Root {
                    x: b,
                    fx: fb,
                    iterations: iter + 1,
                });
            }

            let candidate = if fa != fc && fb != fc && fa != fb {
                // inverse quadratic interpolation
                a * fb * fc / ((fa - fb) * (fa - fc))
                    + b * fa * fc / ((fb - fa) * (fb - fc))
                    + c * fa * fb / ((fc - fa) * (fc - fb))
            } else if fb != fa {
                b - fb * (b - a) / (fb - fa)
            } else {
                (a + b) / 2.0
            };

            let outside = (candidate - (3.0 * a + b) / 4.0) * (candidate - b) > 0.0;
            let slow = if bisected {
                (candidate - b).abs() >= (b - c).abs() / 2.0 || (b - c).abs() < self.tol
            } else {
                (candidate - b).abs() >= (c - d).abs() / 2.0 || (c - d).abs() < self.tol
            };

            bisected = outside || slow;
            let s = if bisected { (a + b) / 2.0 } else { candidate };

            let fs = f(s);
            d = c;
            c = b;
            fc = fb;

            if fa * fs < 0.0 {
                b = s;
                fb = fs;
            } else {
                a = s;
                fa = fs;
            }
        }

        Err(BrentError::MaxIterations {
            current_best: b,
            f_value: fb,
            iterations: self.max_iter,
        })
    }
}

/// Errors from Brent's method
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrentError {
    /// The root is not bracketed by the given interval
    #[error("root not bracketed: f({a}) = {fa}, f({b}) = {fb} (same sign)")]
    NotBracketed {
        /// Left endpoint
        a: f64,
        /// Right endpoint
        b: f64,
        /// Function value at left endpoint
        fa: f64,
        /// Function value at right endpoint
        fb: f64,
    },
    /// Maximum iterations reached without convergence
    #[error("max iterations ({iterations}) reached, best estimate: {current_best}, f = {f_value}")]
    MaxIterations {
        /// Best root estimate so far
        current_best: f64,
        /// Function value at best estimate
        f_value: f64,
        /// Number of iterations performed
        iterations: usize,
    },
}

/// Check if a sign change occurred in the specified direction
pub fn sign_change_detected(g_old: f64, g_new: f64, direction: EventDirection) -> bool {
    if g_old * g_new > 0.0 {
        return false;
    }

    // landing exactly on zero counts; leaving zero does not
    if g_new == 0.0 {
        return true;
    }
    if g_old == 0.0 {
        return false;
    }

    match direction {
        EventDirection::Rising => g_old < 0.0 && g_new > 0.0,
        EventDirection::Falling => g_old > 0.0 && g_new < 0.0,
        EventDirection::Any => true,
    }
}

/// Cubic Hermite interpolation between two accepted points.
///
/// Uses the states and derivatives at `t_a` and `t_b`; O(h^4) accurate.
#[allow(clippy::too_many_arguments)]
pub fn hermite<const N: usize>(
    t: f64,
    t_a: f64,
    y_a: &[f64; N],
    f_a: &[f64; N],
    t_b: f64,
    y_b: &[f64; N],
    f_b: &[f64; N],
) -> [f64; N] {
    let dt = t_b - t_a;
    let alpha = (t - t_a) / dt;
    let a2 = alpha * alpha;
    let a3 = a2 * alpha;
    let h00 = 1.0 - 3.0 * a2 + 2.0 * a3;
    let h10 = alpha - 2.0 * a2 + a3;
    let h01 = 3.0 * a2 - 2.0 * a3;
    let h11 = -a2 + a3;

    let mut y = [0.0; N];
    for i in 0..N {
        y[i] = h00 * y_a[i] + h10 * dt * f_a[i] + h01 * y_b[i] + h11 * dt * f_b[i];
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brent_simple_root() {
        let solver = BrentSolver::default();
        let root = solver
            .find_root(|x| x * x - 2.0, 0.0, 2.0, None, None)
            .unwrap();
        let expected = 2.0_f64.sqrt();

        assert!(
            (root.x - expected).abs() < 1e-12,
            "Root {} should be close to sqrt(2) = {}",
            root.x,
            expected
        );
        assert!(root.fx.abs() < 1e-12, "f(root) = {} should be ~0", root.fx);
        println!("Found root {} in {} iterations", root.x, root.iterations);
    }

    #[test]
    fn test_brent_trigonometric() {
        let solver = BrentSolver::default();
        let root = solver.find_root(|x| x.sin(), 3.0, 4.0, None, None).unwrap();
        assert!((root.x - std::f64::consts::PI).abs() < 1e-12);
        assert!(root.fx.abs() < 1e-12);
    }

    #[test]
    fn test_brent_not_bracketed() {
        let solver = BrentSolver::default();
        let result = solver.find_root(|x| x * x + 1.0, -1.0, 1.0, None, None);
        assert!(matches!(result, Err(BrentError::NotBracketed { .. })));
    }

    #[test]
    fn test_brent_root_at_endpoint() {
        let solver = BrentSolver::default();
        let root = solver.find_root(|x| x + 1.0, -1.0, 1.0, None, None).unwrap();
        assert!((root.x + 1.0).abs() < 1e-12, "Root {} should be -1.0", root.x);
    }

    #[test]
    fn test_brent_triple_root() {
        // convergence degrades on a triple root; accept a looser tolerance
        let solver = BrentSolver::new(1e-12, 100);
        let root = solver
            .find_root(|x| (x - 1.0).powi(3), 0.0, 2.0, None, None)
            .unwrap();
        assert!((root.x - 1.0).abs() < 1e-4, "Triple root {} should be near 1.0", root.x);
    }

    #[test]
    fn test_brent_uses_supplied_values() {
        let solver = BrentSolver::default();
        let mut calls = 0;
        let root = solver
            .find_root(
                |x| {
                    calls += 1;
                    x - 0.25
                },
                0.0,
                1.0,
                Some(-0.25),
                Some(0.75),
            )
            .unwrap();
        assert!((root.x - 0.25).abs() < 1e-12);
        assert_eq!(calls, root.iterations - 1);
    }

    #[test]
    fn test_brent_max_iterations() {
        let solver = BrentSolver::new(0.0, 3);
        let result = solver.find_root(|x| x.powi(3) - x - 2.0, 1.0, 2.0, None, None);
        match result {
            Err(BrentError::MaxIterations {
                current_best,
                iterations,
                ..
            }) => {
                assert_eq!(iterations, 3);
                assert!((1.0..=2.0).contains(&current_best));
            }
            other => panic!("expected MaxIterations, got {:?}", other),
        }
    }

    #[test]
    fn test_sign_change_detection() {
        assert!(sign_change_detected(-1.0, 1.0, EventDirection::Rising));
        assert!(!sign_change_detected(1.0, -1.0, EventDirection::Rising));
        assert!(sign_change_detected(1.0, -1.0, EventDirection::Falling));
        assert!(!sign_change_detected(-1.0, 1.0, EventDirection::Falling));
        assert!(sign_change_detected(-1.0, 1.0, EventDirection::Any));

        assert!(!sign_change_detected(1.0, 2.0, EventDirection::Any));
        assert!(!sign_change_detected(-1.0, -2.0, EventDirection::Any));

        assert!(sign_change_detected(1.0, 0.0, EventDirection::Any));
        assert!(!sign_change_detected(0.0, 1.0, EventDirection::Any));
    }

    #[test]
    fn test_hermite_reproduces_cubic() {
        // y = t^3 - t, y' = 3t^2 - 1: a cubic is reproduced exactly
        let y = |t: f64| [t * t * t - t];
        let f = |t: f64| [3.0 * t * t - 1.0];
        let (t_a, t_b) = (0.5, 2.0);
        for &t in &[0.5, 0.9, 1.3, 1.75, 2.0] {
            let yi = hermite(t, t_a, &y(t_a), &f(t_a), t_b, &y(t_b), &f(t_b));
            assert!(
                (yi[0] - y(t)[0]).abs() < 1e-13,
                "hermite({}) = {}, expected {}",
                t,
                yi[0],
                y(t)[0]
            );
        }
    }

    #[test]
    fn test_event_closure() {
        let g = |_t: f64, y: &[f64; 2]| y[0] - y[1];
        assert_eq!(g.eval(0.0, &[3.0, 1.0]), 2.0);
    }
}
