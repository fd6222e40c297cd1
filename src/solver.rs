//! Runge-Kutta-Fehlberg 4(5) session integrator
//!
//! [`Rkf45`] owns everything that has to survive between calls of one
//! integration: the evaluation counter, the step size, the initialization
//! stage, the status of the previous call, the saved tolerances and the
//! output-request counter. Every call advances a caller-owned [`State`]
//! toward an output time.
//!
//! Reference: Shampine, L.F., Watts, H.A. (1976). "Practical Solution of
//! Ordinary Differential Equations by Runge-Kutta Methods". Sandia
//! Laboratories report SAND76-0585.

use log::{debug, trace, warn};

use crate::coefficients::{ERROR_DEN, EVALS_PER_STEP};
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::events::{
    hermite, sign_change_detected, BrentError, BrentSolver, EventAction, EventConfig,
    EventFunction, EventResult,
};
use crate::status::{Mode, Outcome, Resume, Status};
use crate::step::{error_ratio, fehl};

/// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side of the ODE system
    ///
    /// # Arguments
    /// * `t` - Current time
    /// * `y` - Current state vector
    /// * `dydt` - Output: derivative dy/dt
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

impl<F, const N: usize> OdeSystem<N> for F
where
    F: Fn(f64, &[f64; N], &mut [f64; N]),
{
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]) {
        self(t, y, dydt)
    }
}

/// Mixed relative/absolute error tolerances
///
/// A step is accepted when, for every component, the local error is at
/// most `relerr * |y| + abserr`, with `|y|` the average magnitude over
/// the step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    /// Relative error tolerance
    pub relerr: f64,
    /// Absolute error tolerance
    pub abserr: f64,
}

impl Tolerances {
    /// Create tolerances
    pub fn new(relerr: f64, abserr: f64) -> Self {
        Self { relerr, abserr }
    }
}

/// Step record: time, state and the derivative at that state
///
/// Only accepted steps modify it. After any successful call `yp` equals
/// `f(t, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State<const N: usize> {
    /// Current time
    pub t: f64,
    /// Current state vector
    pub y: [f64; N],
    /// Derivative at `(t, y)`
    pub yp: [f64; N],
}

impl<const N: usize> State<N> {
    /// Initial state; `yp` is filled in by [`Resume::Start`]
    pub fn new(t: f64, y: [f64; N]) -> Self {
        Self {
            t,
            y,
            yp: [0.0; N],
        }
    }
}

/// Integration statistics for diagnostics
///
/// Counted from the last [`Resume::Start`]; unlike the evaluation budget
/// they are not reset by [`Resume::ResetEvaluations`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Total number of function evaluations
    pub fn_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected steps
    pub rejected_steps: u64,
}

/// Initialization stage of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Init {
    /// No session has been started
    Unstarted,
    /// Started; the initial step size is still to be chosen
    Pending,
    /// Step size carried from call to call
    Ready,
}

/// Result of integration with event detection
#[derive(Debug, Clone)]
pub enum IntegrationResult<const N: usize> {
    /// Integration completed normally (reached final time)
    Completed {
        /// Final time
        t: f64,
        /// Final state vector
        y: [f64; N],
    },
    /// Integration stopped at an event
    Event(EventResult<N>),
}

/// Runge-Kutta-Fehlberg 4(5) integrator with per-session state
///
/// # Type Parameters
/// * `N` - Dimension of the state vector
///
/// # Example
/// ```ignore
/// use rkf45::{Outcome, Resume, Rkf45, State, Tolerances};
///
/// let logistic = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| {
///     dydt[0] = 0.25 * y[0] * (1.0 - y[0] / 20.0);
/// };
///
/// let mut solver = Rkf45::new(Tolerances::new(1e-6, 1e-6));
/// let mut state = State::new(0.0, [1.0]);
///
/// let mut resume = Resume::Start;
/// for i in 1..=4 {
///     let tout = 5.0 * i as f64;
///     assert_eq!(solver.advance(&logistic, &mut state, tout, resume)?, Outcome::ReachedTarget);
///     resume = Resume::Continue;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Rkf45<const N: usize> {
    tol: Tolerances,
    config: SolverConfig,
    mode: Mode,
    /// Evaluations charged against `config.max_evaluations`
    nfe: u64,
    /// Step size to try next; signed toward the last output time
    h: f64,
    init: Init,
    /// Status of the previous call; cleared at the start of every valid call
    last: Option<Status>,
    /// Whether the previous valid call started a session
    saved_start: bool,
    /// Consecutive calls with `2|tout - t| <= |h|`
    output_requests: u32,
    relerr_save: f64,
    abserr_save: f64,
    /// Integration statistics
    pub stats: Stats,
    /// Events collected during `integrate_to_event` with `EventAction::Continue`.
    /// Cleared at the start of each `integrate_to_event` call.
    pub collected_events: Vec<EventResult<N>>,
}

impl<const N: usize> Rkf45<N> {
    /// Create a new RKF45 solver with default limits
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            config: SolverConfig::default(),
            mode: Mode::Normal,
            nfe: 0,
            h: 0.0,
            init: Init::Unstarted,
            last: None,
            saved_start: false,
            output_requests: 0,
            relerr_save: -1.0,
            abserr_save: -1.0,
            stats: Stats::default(),
            collected_events: Vec::new(),
        }
    }

    /// Create a solver with explicit limits
    pub fn with_config(tol: Tolerances, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(tol)
        })
    }

    /// Current tolerances (the relative one may have been raised)
    pub fn tolerances(&self) -> Tolerances {
        self.tol
    }

    /// Replace the tolerances used by the next call
    pub fn set_tolerances(&mut self, tol: Tolerances) {
        self.tol = tol;
    }

    /// Session limits
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch between normal and single-step mode
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Derivative evaluations charged against the budget
    pub fn evaluations(&self) -> u64 {
        self.nfe
    }

    /// Step size the next call will try, once a session is running
    pub fn step_size(&self) -> Option<f64> {
        (self.init == Init::Ready).then_some(self.h)
    }

    /// Status reported by the previous call that passed validation
    ///
    /// Refused resumptions and invalid inputs leave it untouched.
    pub fn status(&self) -> Option<Status> {
        self.last
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    /// Advance `state` toward `tout`.
    ///
    /// In [`Mode::Normal`] the call returns once `state.t == tout`; in
    /// [`Mode::SingleStep`] it returns after each accepted step with
    /// [`Outcome::Continuing`] until the output time is reached.
    ///
    /// The first call of a session uses [`Resume::Start`], later calls
    /// [`Resume::Continue`]. Recoverable errors must be answered on the
    /// next call, either by the matching recovery variant or by
    /// `Continue` after fixing the cause; retrying a vanished solution
    /// with `abserr == 0`, or an unachievable tolerance without loosening
    /// it, yields [`SolverError::ResumeRefused`].
    pub fn advance<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        state: &mut State<N>,
        tout: f64,
        resume: Resume,
    ) -> Result<Outcome> {
        self.validate_inputs(state.t, tout)?;

        let mut start = resume == Resume::Start;
        if !start {
            let clamped = self.last == Some(Status::RelErrTooSmall);

            if state.t == tout && !clamped {
                if resume == Resume::Continue && self.last == Some(Status::ReachedTarget) {
                    return Ok(Outcome::ReachedTarget);
                }
                return Err(SolverError::invalid(format!(
                    "t = tout = {} on a continuation call",
                    tout
                )));
            }

            if self.init == Init::Unstarted && !(clamped && self.saved_start) {
                return Err(SolverError::invalid(
                    "no integration session has been started",
                ));
            }

            let restart = clamped && self.saved_start;
            match resume {
                Resume::Start => {}
                Resume::Continue => match self.last {
                    Some(Status::RelErrTooSmall) => start = restart,
                    _ if self.init == Init::Pending => {}
                    Some(Status::TooManyEvaluations) => self.nfe = 0,
                    Some(Status::SolutionVanished) if self.tol.abserr == 0.0 => {
                        return Err(SolverError::refused(
                            "solution vanished and abserr is still zero",
                        ));
                    }
                    Some(Status::ToleranceUnachievable)
                        if self.tol.relerr <= self.relerr_save
                            && self.tol.abserr <= self.abserr_save =>
                    {
                        return Err(SolverError::refused(
                            "tolerance unachievable and neither relerr nor abserr was increased",
                        ));
                    }
                    _ => {}
                },
                Resume::AcceptRelErr => start = restart,
                Resume::ResetEvaluations => {
                    self.nfe = 0;
                    start = restart;
                }
                Resume::RetryWithAbsErr => {
                    if self.tol.abserr <= 0.0 {
                        return Err(SolverError::refused(
                            "retry after a vanished solution requires abserr > 0",
                        ));
                    }
                    start = restart;
                }
            }
        }

        self.saved_start = start;
        self.last = None;
        self.relerr_save = self.tol.relerr;
        self.abserr_save = self.tol.abserr;

        let relerr_min = self.config.min_relerr();
        if self.tol.relerr < relerr_min {
            let requested = self.tol.relerr;
            self.tol.relerr = relerr_min;
            return Err(self.fail(SolverError::RelErrTooSmall {
                requested,
                adjusted: relerr_min,
            }));
        }

        let eps = f64::EPSILON;
        let mut dt = tout - state.t;

        if start {
            self.init = Init::Pending;
            self.output_requests = 0;
            self.stats = Stats::default();
            self.nfe = 0;
            sys.rhs(state.t, &state.y, &mut state.yp);
            self.charge(1);
            debug!("session started at t = {} toward tout = {}", state.t, tout);

            if state.t == tout {
                return Ok(self.succeed(Outcome::ReachedTarget));
            }
        }

        if self.init == Init::Pending {
            self.init = Init::Ready;
            self.h = self.initial_step(state, dt);
            debug!("initial step size {:e}", self.h);
        }

        self.h = sign(dt) * self.h.abs();

        if 2.0 * dt.abs() <= self.h.abs() {
            self.output_requests += 1;
        } else {
            self.output_requests = 0;
        }
        if self.output_requests >= self.config.max_output_requests {
            let requests = self.output_requests;
            self.output_requests = 0;
            return Err(self.fail(SolverError::ExcessiveOutputRequests { requests }));
        }

        // Too close to the output point for a proper step: extrapolate
        if dt.abs() <= 26.0 * eps * state.t.abs() {
            if self.nfe + 1 > self.config.max_evaluations {
                return Err(self.fail(SolverError::TooManyEvaluations {
                    evaluations: self.nfe,
                }));
            }
            for i in 0..N {
                state.y[i] += dt * state.yp[i];
            }
            state.t = tout;
            sys.rhs(state.t, &state.y, &mut state.yp);
            self.charge(1);
            return Ok(self.succeed(Outcome::ReachedTarget));
        }

        let mut output = false;

        // Scaled tolerances avoid premature underflow in the error test
        let scale = 2.0 / self.tol.relerr;
        let ae = scale * self.tol.abserr;

        loop {
            let mut h_failed = false;
            let h_min = 26.0 * eps * state.t.abs();

            // Look two steps ahead so output points do not force drastic changes
            dt = tout - state.t;
            if 2.0 * self.h.abs() > dt.abs() {
                if dt.abs() <= self.h.abs() {
                    output = true;
                    self.h = dt;
                } else {
                    self.h = 0.5 * dt;
                }
            }

            let (solution, esttol) = loop {
                if self.nfe + EVALS_PER_STEP + 1 > self.config.max_evaluations {
                    return Err(self.fail(SolverError::TooManyEvaluations {
                        evaluations: self.nfe,
                    }));
                }

                let stages = fehl(sys, &state.y, state.t, self.h, &state.yp);
                self.charge(EVALS_PER_STEP);

                let Some(ratio) = error_ratio(&stages, &state.y, &state.yp, ae) else {
                    return Err(self.fail(SolverError::SolutionVanished { t: state.t }));
                };

                let esttol = self.h.abs() * ratio * scale / ERROR_DEN;
                if esttol <= 1.0 {
                    break (stages.s, esttol);
                }

                // Rejected: shrink by at most a factor of 10 and retry
                h_failed = true;
                output = false;
                let factor = self.config.controller.shrink_factor(esttol);
                trace!(
                    "reject t = {} h = {:e} esttol = {:e} factor = {}",
                    state.t,
                    self.h,
                    esttol,
                    factor
                );
                self.h *= factor;
                self.stats.rejected_steps += 1;

                if self.h.abs() < h_min {
                    return Err(self.fail(SolverError::ToleranceUnachievable {
                        t: state.t,
                        h: self.h,
                        h_min,
                    }));
                }
            };

            state.t += self.h;
            state.y = solution;
            sys.rhs(state.t, &state.y, &mut state.yp);
            self.charge(1);
            self.stats.accepted_steps += 1;

            // Grow by at most 5, and not at all right after a rejection
            let s = self.config.controller.grow_factor(esttol, h_failed);
            trace!(
                "accept t = {} h = {:e} esttol = {:e} factor = {}",
                state.t,
                self.h,
                esttol,
                s
            );
            self.h = sign(self.h) * (s * self.h.abs()).max(h_min);

            if output {
                state.t = tout;
                return Ok(self.succeed(Outcome::ReachedTarget));
            }

            if self.mode == Mode::SingleStep {
                return Ok(self.succeed(Outcome::Continuing));
            }
        }
    }

    /// Integrate from t0 to tf
    ///
    /// Starts a new session. A relative tolerance below the attainable
    /// floor is raised and accepted; every other error is returned.
    pub fn integrate<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
    ) -> Result<State<N>> {
        let mut state = State::new(t0, *y0);
        let mut resume = Resume::Start;
        loop {
            match self.advance_accepting_relerr(sys, &mut state, tf, resume)? {
                Outcome::ReachedTarget => return Ok(state),
                Outcome::Continuing => resume = Resume::Continue,
            }
        }
    }

    /// Integrate from t0 through each output time in turn
    ///
    /// Returns one state per entry of `outputs`. The first output may be
    /// `t0` itself.
    pub fn solve_at<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        outputs: &[f64],
    ) -> Result<Vec<State<N>>> {
        let mut state = State::new(t0, *y0);
        let mut trajectory = Vec::with_capacity(outputs.len());
        let mut resume = Resume::Start;

        for &tout in outputs {
            while self.advance_accepting_relerr(sys, &mut state, tout, resume)?
                == Outcome::Continuing
            {
                resume = Resume::Continue;
            }
            resume = Resume::Continue;
            trajectory.push(state);
        }

        Ok(trajectory)
    }

    /// Integrate until an event occurs or the final time is reached.
    ///
    /// The session runs in single-step mode so the event function is
    /// checked after every accepted step; the previous mode is restored
    /// afterwards. On a sign change, Brent's method finds the crossing on
    /// the Hermite interpolant of the step.
    ///
    /// # Returns
    /// * `Ok(IntegrationResult::Event(event_result))` - Event was detected
    /// * `Ok(IntegrationResult::Completed { t, y })` - Reached tf without event
    /// * `Err(SolverError)` - Integration failed
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Logistic growth: when does the population reach 10?
    /// let event = |_t: f64, y: &[f64; 1]| y[0] - 10.0;
    /// let config = EventConfig {
    ///     direction: EventDirection::Rising,
    ///     ..Default::default()
    /// };
    ///
    /// let result = solver.integrate_to_event(&logistic, &event, &config, 0.0, &[1.0], 40.0);
    /// ```
    pub fn integrate_to_event<S, E>(
        &mut self,
        sys: &S,
        event: &E,
        config: &EventConfig,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
    ) -> Result<IntegrationResult<N>>
    where
        S: OdeSystem<N>,
        E: EventFunction<N>,
    {
        self.validate_inputs(t0, tf)?;
        if t0 == tf {
            return Ok(IntegrationResult::Completed { t: t0, y: *y0 });
        }
        self.collected_events.clear();

        let mode = self.mode;
        self.mode = Mode::SingleStep;
        let result = self.track_events(sys, event, config, t0, y0, tf);
        self.mode = mode;
        result
    }

    fn track_events<S, E>(
        &mut self,
        sys: &S,
        event: &E,
        config: &EventConfig,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
    ) -> Result<IntegrationResult<N>>
    where
        S: OdeSystem<N>,
        E: EventFunction<N>,
    {
        // Output at t0 first so the initial record carries its derivative
        let mut state = State::new(t0, *y0);
        self.advance_accepting_relerr(sys, &mut state, t0, Resume::Start)?;
        let mut g_prev = event.eval(state.t, &state.y);

        loop {
            let prev = state;
            let outcome = self.advance_accepting_relerr(sys, &mut state, tf, Resume::Continue)?;
            let g_new = event.eval(state.t, &state.y);

            if sign_change_detected(g_prev, g_new, config.direction) {
                let found = find_event_root(event, &prev, &state, g_prev, g_new, config)?;
                match config.action {
                    EventAction::Stop => return Ok(IntegrationResult::Event(found)),
                    EventAction::Continue => self.collected_events.push(found),
                }
            }
            g_prev = g_new;

            if outcome == Outcome::ReachedTarget {
                return Ok(IntegrationResult::Completed {
                    t: state.t,
                    y: state.y,
                });
            }
        }
    }

    fn advance_accepting_relerr<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        state: &mut State<N>,
        tout: f64,
        resume: Resume,
    ) -> Result<Outcome> {
        match self.advance(sys, state, tout, resume) {
            Err(SolverError::RelErrTooSmall {
                requested,
                adjusted,
            }) => {
                warn!(
                    "relative tolerance {:e} below floor, continuing with {:e}",
                    requested, adjusted
                );
                self.advance(sys, state, tout, Resume::AcceptRelErr)
            }
            other => other,
        }
    }

    /// Starting step: the whole interval, shrunk so that the first-order
    /// term `|yp| h^5` stays within tolerance in every component.
    fn initial_step(&self, state: &State<N>, dt: f64) -> f64 {
        let mut h = dt.abs();
        let mut toln = 0.0;

        for k in 0..N {
            let tol = self.tol.relerr * state.y[k].abs() + self.tol.abserr;
            if tol > 0.0 {
                toln = tol;
                let ypk = state.yp[k].abs();
                if tol < ypk * h.powf(5.0) {
                    h = (tol / ypk).powf(0.2);
                }
            }
        }

        if toln <= 0.0 {
            h = 0.0;
        }

        h.max(26.0 * f64::EPSILON * state.t.abs().max(dt.abs()))
    }

    fn validate_inputs(&self, t: f64, tout: f64) -> Result<()> {
        if N < 1 {
            return Err(SolverError::invalid("the system must have at least one equation"));
        }
        if !t.is_finite() || !tout.is_finite() {
            return Err(SolverError::invalid("t and tout must be finite"));
        }
        if !(self.tol.relerr >= 0.0 && self.tol.relerr.is_finite()) {
            return Err(SolverError::invalid(format!(
                "relerr must be non-negative and finite, got {}",
                self.tol.relerr
            )));
        }
        if !(self.tol.abserr >= 0.0 && self.tol.abserr.is_finite()) {
            return Err(SolverError::invalid(format!(
                "abserr must be non-negative and finite, got {}",
                self.tol.abserr
            )));
        }
        Ok(())
    }

    fn charge(&mut self, evals: u64) {
        self.nfe += evals;
        self.stats.fn_evals += evals;
    }

    fn succeed(&mut self, outcome: Outcome) -> Outcome {
        self.last = Some(outcome.into());
        outcome
    }

    fn fail(&mut self, err: SolverError) -> SolverError {
        self.last = err.status();
        debug!("integration stopped: {}", err);
        err
    }
}

/// Locate an event inside the step `a -> b` on the Hermite interpolant.
fn find_event_root<E: EventFunction<N>, const N: usize>(
    event: &E,
    a: &State<N>,
    b: &State<N>,
    g_a: f64,
    g_b: f64,
    config: &EventConfig,
) -> Result<EventResult<N>> {
    let solver = BrentSolver::new(config.root_tol, config.max_iter);
    let interp = |t: f64| hermite(t, a.t, &a.y, &a.yp, b.t, &b.y, &b.yp);

    match solver.find_root(|t| event.eval(t, &interp(t)), a.t, b.t, Some(g_a), Some(g_b)) {
        Ok(root) => Ok(EventResult {
            t: root.x,
            y: interp(root.x),
            g_value: root.fx,
            iterations: root.iterations,
        }),
        Err(BrentError::NotBracketed { .. }) => Err(SolverError::EventFindingFailed {
            message: "root not bracketed despite sign change detection".to_string(),
        }),
        // best estimate is still inside the step
        Err(BrentError::MaxIterations {
            current_best,
            f_value,
            iterations,
        }) => Ok(EventResult {
            t: current_best,
            y: interp(current_best),
            g_value: f_value,
            iterations,
        }),
    }
}

/// Sign transfer with sign(0) = +1
fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}
