//! Session status, caller intent and integration mode

/// How far a single call to [`crate::Rkf45::advance`] may go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Integrate all the way to the requested output time
    #[default]
    Normal,
    /// Return after every accepted step (classic negative flags)
    SingleStep,
}

/// What the caller wants the next call to do
///
/// The recovery variants acknowledge a previous [`crate::SolverError`].
/// `Continue` also acknowledges them, with the same checks the classic
/// code applies to a flag of 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Begin a new session: evaluate `yp` at the initial point (flag 1)
    Start,
    /// Carry on from where the session stopped (flag 2)
    Continue,
    /// Accept the raised relative tolerance and retry (flag 3)
    AcceptRelErr,
    /// Grant a fresh evaluation budget and continue (flag 4)
    ResetEvaluations,
    /// Continue after a vanished solution; requires `abserr > 0` (flag 5)
    RetryWithAbsErr,
}

/// Successful result of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state is at the requested output time
    ReachedTarget,
    /// One step was taken in single-step mode; the output time is still ahead
    Continuing,
}

/// Every status a call can report, with its classic flag value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Single step taken (flag -2)
    Continuing,
    /// Output time reached (flag 2)
    ReachedTarget,
    /// Relative tolerance raised to the floor (flag 3)
    RelErrTooSmall,
    /// Evaluation budget exhausted (flag 4)
    TooManyEvaluations,
    /// Solution vanished with zero absolute tolerance (flag 5)
    SolutionVanished,
    /// Step size below the roundoff limit (flag 6)
    ToleranceUnachievable,
    /// Output points requested too often (flag 7)
    ExcessiveOutputRequests,
    /// Invalid input (flag 8)
    InvalidInput,
}

impl Status {
    /// Classic integer flag for this status
    pub fn flag(self) -> i32 {
        match self {
            Status::Continuing => -2,
            Status::ReachedTarget => 2,
            Status::RelErrTooSmall => 3,
            Status::TooManyEvaluations => 4,
            Status::SolutionVanished => 5,
            Status::ToleranceUnachievable => 6,
            Status::ExcessiveOutputRequests => 7,
            Status::InvalidInput => 8,
        }
    }

    /// Whether this status is a normal return
    pub fn is_success(self) -> bool {
        matches!(self, Status::Continuing | Status::ReachedTarget)
    }
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::ReachedTarget => Status::ReachedTarget,
            Outcome::Continuing => Status::Continuing,
        }
    }
}
