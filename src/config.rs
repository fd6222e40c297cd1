//! Solver configuration and step-size control

use crate::coefficients::EMBEDDED_ORDER;
use crate::error::{Result, SolverError};

/// Exponent of the step-size update: 1/(p+1) for the order of the error estimate
const EXPONENT: f64 = 1.0 / (EMBEDDED_ORDER as f64 + 1.0);

/// Step-size controller of the Shampine-Watts RKF45 code
///
/// After a rejected step: h_new = h * safety / esttol^(1/5), at least
/// `min_shrink` times the old step. After an accepted step the same
/// formula is capped at `max_growth`, and at 1 if the step was retried.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepController {
    /// Safety factor applied to the predicted step
    pub safety: f64,
    /// Maximum growth factor per accepted step
    pub max_growth: f64,
    /// Minimum reduction factor per rejected step
    pub min_shrink: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_growth: 5.0,
            min_shrink: 0.1,
        }
    }
}

impl StepController {
    /// Factor for the step following an accepted step
    ///
    /// Below `(safety / max_growth)^5` (1.889568e-4 for the defaults) the
    /// formula would exceed `max_growth`, so the cap is used directly.
    pub fn grow_factor(&self, esttol: f64, after_rejection: bool) -> f64 {
        let threshold = (self.safety / self.max_growth).powi(5);
        let s = if esttol > threshold {
            self.safety / esttol.powf(EXPONENT)
        } else {
            self.max_growth
        };
        if after_rejection {
            s.min(1.0)
        } else {
            s
        }
    }

    /// Factor for retrying a rejected step
    ///
    /// At or above `(safety / min_shrink)^5` (59049 for the defaults) the
    /// reduction is limited to `min_shrink`.
    pub fn shrink_factor(&self, esttol: f64) -> f64 {
        let threshold = (self.safety / self.min_shrink).powi(5);
        if esttol < threshold {
            self.safety / esttol.powf(EXPONENT)
        } else {
            self.min_shrink
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return Err(config_error(format!(
                "safety must be in (0, 1], got {}",
                self.safety
            )));
        }
        if !(self.max_growth >= 1.0 && self.max_growth.is_finite()) {
            return Err(config_error(format!(
                "max_growth must be finite and >= 1, got {}",
                self.max_growth
            )));
        }
        if !(self.min_shrink > 0.0 && self.min_shrink < 1.0) {
            return Err(config_error(format!(
                "min_shrink must be in (0, 1), got {}",
                self.min_shrink
            )));
        }
        Ok(())
    }
}

/// Limits and constants of an integration session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Derivative evaluations allowed before `TooManyEvaluations`.
    /// Default: 3,000,000.
    pub max_evaluations: u64,

    /// Consecutive calls with output points closer than half the natural
    /// step before `ExcessiveOutputRequests`. Default: 2000.
    pub max_output_requests: u32,

    /// Added to `2 * EPSILON` to form the smallest accepted relative
    /// tolerance. Default: 1e-12.
    pub relerr_floor: f64,

    /// Step-size adaptation
    pub controller: StepController,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 3_000_000,
            max_output_requests: 2000,
            relerr_floor: 1e-12,
            controller: StepController::default(),
        }
    }
}

impl SolverConfig {
    /// Smallest relative tolerance the solver will work with
    pub fn min_relerr(&self) -> f64 {
        2.0 * f64::EPSILON + self.relerr_floor
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        // one trial step plus the derivative at the new point
        if self.max_evaluations < 6 {
            return Err(config_error(format!(
                "max_evaluations must be >= 6, got {}",
                self.max_evaluations
            )));
        }
        if self.max_output_requests == 0 {
            return Err(config_error("max_output_requests must be > 0"));
        }
        if !(self.relerr_floor >= 0.0 && self.relerr_floor.is_finite()) {
            return Err(config_error(format!(
                "relerr_floor must be finite and >= 0, got {}",
                self.relerr_floor
            )));
        }
        self.controller.validate()
    }

    /// Load from JSON string. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| config_error(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

fn config_error(message: impl Into<String>) -> SolverError {
    SolverError::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let c = StepController::default();
        // esttol below 0.18^5 grows by the full factor of 5
        assert_eq!(c.grow_factor(1.0e-4, false), 5.0);
        assert_eq!(c.grow_factor(0.0, false), 5.0);
        // esttol at or above 9^5 shrinks by the full factor of 10
        assert_eq!(c.shrink_factor(59049.0), 0.1);
        assert_eq!(c.shrink_factor(1.0e12), 0.1);
    }

    #[test]
    fn test_unit_error() {
        let c = StepController::default();
        assert!((c.grow_factor(1.0, false) - 0.9).abs() < 1e-15);
        assert!((c.shrink_factor(1.0) - 0.9).abs() < 1e-15);
    }

    #[test]
    fn test_growth_bounded() {
        let c = StepController::default();
        for &e in &[0.0, 1e-10, 1.889e-4, 1.9e-4, 1e-3, 0.5, 1.0] {
            let s = c.grow_factor(e, false);
            assert!(s <= 5.0 + 1e-12, "grow_factor({}) = {} exceeds 5", e, s);
            assert!(c.grow_factor(e, true) <= 1.0);
        }
    }

    #[test]
    fn test_shrink_bounded() {
        let c = StepController::default();
        for &e in &[1.0 + 1e-12, 2.0, 100.0, 59048.0, 59049.0, 1e300] {
            let s = c.shrink_factor(e);
            assert!(s >= 0.1 - 1e-12, "shrink_factor({}) = {} below 0.1", e, s);
            assert!(s < 1.0);
        }
    }

    #[test]
    fn test_continuous_at_thresholds() {
        let c = StepController::default();
        let just_above = 0.18_f64.powi(5) * (1.0 + 1e-9);
        assert!((c.grow_factor(just_above, false) - 5.0).abs() < 1e-6);
        let just_below = 59049.0 * (1.0 - 1e-9);
        assert!((c.shrink_factor(just_below) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        assert!(SolverConfig::default().validate().is_ok());

        let bad = SolverConfig {
            max_evaluations: 3,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(SolverError::Config { .. })));

        let bad = SolverConfig {
            relerr_floor: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SolverConfig {
            controller: StepController {
                min_shrink: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_min_relerr() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.min_relerr(), 2.0 * f64::EPSILON + 1e-12);
    }
}
