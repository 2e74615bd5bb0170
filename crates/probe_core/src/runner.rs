//! Sequencing of dependent steps.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s. The [`ScenarioRunner`]
//! executes them one at a time against a shared [`ScenarioContext`], skipping
//! steps whose preconditions are unmet and, once authentication is lost,
//! every step that needs it. Nothing a step does can abort the run.

use crate::aggregator::ResultAggregator;
use crate::clock::Clock;
use crate::context::ScenarioContext;
use crate::error::{AuthError, JobError};
use crate::poller::{JobPoller, PollBudget};
use crate::recorder::{Expect, Recorded, RequestRecorder};
use crate::session::SessionManager;
use crate::transport::{ApiRequest, Transport};
use crate::types::{Failure, FailureKind, StepOutcome, StepResult};
use tracing::{info, warn};

/// Skip reason for steps that need a session after authentication failed.
pub const AUTH_UNAVAILABLE: &str = "authentication unavailable";

/// Collaborators handed to each step body.
pub struct StepEnv<'a> {
    pub recorder: RequestRecorder<'a>,
    pub session: SessionManager<'a>,
    pub poller: JobPoller<'a>,
    pub budget: PollBudget,
}

impl<'a> StepEnv<'a> {
    pub fn new(transport: &'a dyn Transport, clock: &'a dyn Clock, budget: PollBudget) -> Self {
        let recorder = RequestRecorder::new(transport);
        Self {
            recorder,
            session: SessionManager::new(recorder),
            poller: JobPoller::new(recorder, clock),
            budget,
        }
    }

    /// Execute `request` with the current access token attached (if any).
    pub fn call(&self, request: ApiRequest, expect: &Expect) -> Recorded {
        let request = request.auth(self.session.bearer());
        self.recorder.execute(&request, expect)
    }

    /// Execute `request` exactly as given, without adding credentials.
    pub fn call_anonymous(&self, request: ApiRequest, expect: &Expect) -> Recorded {
        self.recorder.execute(&request, expect)
    }
}

/// What a step body reports back to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepOutput {
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    pub failure: Option<Failure>,
    pub note: Option<String>,
}

impl StepOutput {
    /// A pass with no HTTP call of its own.
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// Statuses and classification of a recorded call.
    pub fn from_recorded(rec: &Recorded) -> Self {
        Self {
            expected_status: Some(rec.expected_status),
            actual_status: rec.actual_status,
            failure: rec.failure.clone(),
            note: None,
        }
    }

    /// Statuses of an auth operation that was expected to answer `expected`.
    pub fn from_auth_result<T>(result: &Result<T, AuthError>, expected: u16) -> Self {
        match result {
            Ok(_) => Self::passed().with_status(expected, Some(expected)),
            Err(err) => Self::failed(auth_failure(err)).with_status(expected, err.status()),
        }
    }

    pub fn from_job_error(err: &JobError) -> Self {
        let kind = match err {
            JobError::Failed { .. } => FailureKind::JobFailed,
            JobError::Timeout { .. } => FailureKind::JobTimeout,
            JobError::MissingJobId => FailureKind::Protocol,
            JobError::SubmitRejected { status: None, .. } | JobError::PollFailed(_) => {
                FailureKind::Transport
            }
            JobError::SubmitRejected { .. } => FailureKind::StatusMismatch,
        };
        let out = Self::failed(Failure::new(kind, err.to_string()));
        match err {
            JobError::SubmitRejected { status, .. } => Self {
                actual_status: *status,
                ..out
            },
            _ => out,
        }
    }

    pub fn with_status(mut self, expected: u16, actual: Option<u16>) -> Self {
        self.expected_status = Some(expected);
        self.actual_status = actual;
        self
    }

    /// Replace any earlier classification with `failure`.
    pub fn fail_with(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_passed(&self) -> bool {
        self.failure.is_none()
    }

    fn into_result(self, name: &str, duration_ms: u64) -> StepResult {
        StepResult {
            name: name.to_string(),
            outcome: if self.failure.is_some() {
                StepOutcome::Failed
            } else {
                StepOutcome::Passed
            },
            expected_status: self.expected_status,
            actual_status: self.actual_status,
            duration_ms,
            failure: self.failure,
            note: self.note,
        }
    }
}

/// Classify an auth error as a step failure. A rejected refresh means the
/// session can no longer be renewed.
pub fn auth_failure(err: &AuthError) -> Failure {
    let kind = match err {
        AuthError::InvalidRefreshToken | AuthError::MissingRefreshToken => FailureKind::AuthExpired,
        AuthError::MalformedTokens(_) => FailureKind::Protocol,
        AuthError::Transport(_) => FailureKind::Transport,
        _ => FailureKind::StatusMismatch,
    };
    Failure::new(kind, err.to_string())
}

type StepBody = Box<dyn FnMut(&mut StepEnv<'_>, &mut ScenarioContext) -> StepOutput>;

struct Precondition {
    reason: &'static str,
    check: fn(&ScenarioContext) -> bool,
}

/// A named unit of work.
///
/// Steps require a session by default; see [`Step::public`].
pub struct Step {
    name: String,
    preconditions: Vec<Precondition>,
    requires_auth: bool,
    blocking: bool,
    body: StepBody,
}

impl Step {
    pub fn new(
        name: &str,
        body: impl FnMut(&mut StepEnv<'_>, &mut ScenarioContext) -> StepOutput + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            preconditions: Vec::new(),
            requires_auth: true,
            blocking: false,
            body: Box::new(body),
        }
    }

    /// The step runs even when no session is available.
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Failure of this step means the run has no usable session.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// Skip with `reason` unless `check` holds when the step comes up.
    /// Checked in the order added; the first unmet one names the skip.
    pub fn requires(mut self, reason: &'static str, check: fn(&ScenarioContext) -> bool) -> Self {
        self.preconditions.push(Precondition { reason, check });
        self
    }

    fn unmet(&self, ctx: &ScenarioContext) -> Option<&'static str> {
        self.preconditions
            .iter()
            .find(|p| !(p.check)(ctx))
            .map(|p| p.reason)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("requires_auth", &self.requires_auth)
            .field("blocking", &self.blocking)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for an ordered list of steps.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append every step of `other`.
    pub fn then(mut self, other: Scenario) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Steps that are skipped when no session is available.
    pub fn auth_dependent_count(&self) -> usize {
        self.steps.iter().filter(|s| s.requires_auth).count()
    }
}

/// Progress notifications emitted while a scenario runs.
#[derive(Debug)]
pub enum StepEvent<'e> {
    Started {
        index: usize,
        total: usize,
        name: &'e str,
    },
    Finished(&'e StepResult),
}

/// Executes scenarios against a transport.
pub struct ScenarioRunner<'a> {
    transport: &'a dyn Transport,
    clock: &'a dyn Clock,
    budget: PollBudget,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(transport: &'a dyn Transport, clock: &'a dyn Clock) -> Self {
        Self {
            transport,
            clock,
            budget: PollBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Execute all steps in sequence.
    pub fn run(&self, scenario: Scenario, ctx: &mut ScenarioContext) -> ResultAggregator {
        self.run_with_progress(scenario, ctx, &mut |_| {})
    }

    /// Execute all steps in sequence, reporting each start and outcome.
    pub fn run_with_progress(
        &self,
        scenario: Scenario,
        ctx: &mut ScenarioContext,
        on_event: &mut dyn FnMut(StepEvent<'_>),
    ) -> ResultAggregator {
        let mut env = StepEnv::new(self.transport, self.clock, self.budget);
        let mut results = ResultAggregator::new();
        let mut auth_lost = false;
        let total = scenario.steps.len();

        info!(scenario = %scenario.name, steps = total, "scenario started");

        for (index, mut step) in scenario.steps.into_iter().enumerate() {
            on_event(StepEvent::Started {
                index,
                total,
                name: &step.name,
            });

            let result = if auth_lost && step.requires_auth {
                StepResult::skipped(&step.name, AUTH_UNAVAILABLE)
            } else if let Some(reason) = step.unmet(ctx) {
                StepResult::skipped(&step.name, reason)
            } else {
                let started = self.clock.now();
                let output = (step.body)(&mut env, ctx);
                let duration_ms = self.clock.now().saturating_sub(started).as_millis() as u64;
                output.into_result(&step.name, duration_ms)
            };

            match result.outcome {
                StepOutcome::Passed => {
                    info!(step = %result.name, ms = result.duration_ms, "passed")
                }
                StepOutcome::Skipped => {
                    info!(step = %result.name, reason = %result.reason(), "skipped")
                }
                StepOutcome::Failed => {
                    warn!(step = %result.name, reason = %result.reason(), "failed")
                }
            }

            if result.outcome == StepOutcome::Failed && !auth_lost {
                let expired = result
                    .failure
                    .as_ref()
                    .is_some_and(|f| f.kind == FailureKind::AuthExpired);
                if step.blocking || expired {
                    warn!(step = %result.name, "authentication lost; skipping dependent steps");
                    auth_lost = true;
                }
            }

            on_event(StepEvent::Finished(&result));
            results.record(result);
        }

        results
    }
}
