//! Errors returned by the RKF45 session solver

use thiserror::Error;

use crate::status::Status;

/// Errors that can occur during integration
///
/// The first six variants correspond to the classic status flags 3-8 and
/// leave the session in a state the caller can respond to (see
/// [`crate::Resume`]). The remaining variants have no flag equivalent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Relative tolerance was below the attainable floor and has been raised
    #[error("relative tolerance {requested:e} too small, raised to {adjusted:e}")]
    RelErrTooSmall {
        /// Value the caller asked for
        requested: f64,
        /// Value now stored in the session tolerances
        adjusted: f64,
    },
    /// The derivative evaluation budget has been used up
    #[error("derivative evaluation budget exhausted after {evaluations} evaluations")]
    TooManyEvaluations {
        /// Evaluations charged to the budget so far
        evaluations: u64,
    },
    /// A solution component vanished while the absolute tolerance is zero
    #[error("solution vanished at t = {t}; a pure relative error test is impossible")]
    SolutionVanished {
        /// Time at the start of the failed step
        t: f64,
    },
    /// The step size fell below the smallest step allowed at the current time
    #[error("requested accuracy unachievable at t = {t}: step {h:e} below minimum {h_min:e}")]
    ToleranceUnachievable {
        /// Time at the start of the failed step
        t: f64,
        /// Step size that was too small
        h: f64,
        /// Smallest allowed step at `t`
        h_min: f64,
    },
    /// Output points are requested much closer together than the natural step size
    #[error("{requests} consecutive output requests closer than the natural step size")]
    ExcessiveOutputRequests {
        /// Number of consecutive offending requests
        requests: u32,
    },
    /// Invalid input parameters
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid input
        message: String,
    },
    /// The caller resumed without responding to the previous failure
    #[error("integration cannot be continued: {message}")]
    ResumeRefused {
        /// What the caller must change first
        message: String,
    },
    /// Event finding failed
    #[error("event finding failed: {message}")]
    EventFindingFailed {
        /// Description of the failure
        message: String,
    },
    /// Invalid or unreadable solver configuration
    #[error("config error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Status this error reports, if it has a classic flag equivalent
    pub fn status(&self) -> Option<Status> {
        match self {
            SolverError::RelErrTooSmall { .. } => Some(Status::RelErrTooSmall),
            SolverError::TooManyEvaluations { .. } => Some(Status::TooManyEvaluations),
            SolverError::SolutionVanished { .. } => Some(Status::SolutionVanished),
            SolverError::ToleranceUnachievable { .. } => Some(Status::ToleranceUnachievable),
            SolverError::ExcessiveOutputRequests { .. } => Some(Status::ExcessiveOutputRequests),
            SolverError::InvalidInput { .. } => Some(Status::InvalidInput),
            SolverError::ResumeRefused { .. }
            | SolverError::EventFindingFailed { .. }
            | SolverError::Config { .. } => None,
        }
    }

    /// Whether the session can continue once the caller responds
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SolverError::RelErrTooSmall { .. }
                | SolverError::TooManyEvaluations { .. }
                | SolverError::SolutionVanished { .. }
                | SolverError::ToleranceUnachievable { .. }
                | SolverError::ExcessiveOutputRequests { .. }
        )
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SolverError::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn refused(message: impl Into<String>) -> Self {
        SolverError::ResumeRefused {
            message: message.into(),
        }
    }
}
