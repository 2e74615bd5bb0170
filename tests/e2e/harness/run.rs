use super::assertions::Assertion;
use super::clock::MockClock;
use super::fake_api::FakeApi;
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use probe_core::{
    Credentials, FailureKind, ImageAsset, PollBudget, ResultAggregator, Scenario,
    ScenarioContext, ScenarioRunner, StepOutcome, StepResult,
};
use std::time::Duration;

/// Smallest JPEG-looking payload the fake accepts as a floor plan.
const PLAN_BYTES: &[u8] = b"\xff\xd8\xff\xe0probe-floor-plan";

pub fn plan_image() -> ImageAsset {
    ImageAsset {
        file_name: "plan.jpg".to_string(),
        mime: "image/jpeg".to_string(),
        base64: STANDARD.encode(PLAN_BYTES),
        bytes: PLAN_BYTES.to_vec(),
    }
}

/// Fluent DSL for running a flow against the fake API
pub struct FlowRun {
    name: String,
    scenario: Scenario,
    api: FakeApi,
    image: Option<ImageAsset>,
    budget: PollBudget,
    credentials: Credentials,
    assertions: Vec<Assertion>,
}

impl FlowRun {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            name: scenario.name().to_string(),
            scenario,
            api: FakeApi::new(),
            image: Some(plan_image()),
            budget: PollBudget::new(Duration::from_secs(2), 30),
            credentials: Credentials::unique(
                "e2e",
                "granula.test",
                "SecurePassword123!",
                "E2E User",
            ),
            assertions: Vec::new(),
        }
    }

    // ===== Setup =====

    pub fn api(mut self, api: FakeApi) -> Self {
        self.api = api;
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }

    pub fn budget(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.budget = PollBudget::new(interval, max_attempts);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    // ===== Assertions =====

    pub fn expect(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn expect_passed(self, step: &str) -> Self {
        self.expect_outcome(step, StepOutcome::Passed)
    }

    pub fn expect_skipped(self, step: &str) -> Self {
        self.expect_outcome(step, StepOutcome::Skipped)
    }

    pub fn expect_outcome(self, step: &str, outcome: StepOutcome) -> Self {
        self.expect(Assertion::Outcome {
            step: step.to_string(),
            outcome,
        })
    }

    pub fn expect_status(self, step: &str, status: u16) -> Self {
        self.expect(Assertion::Status {
            step: step.to_string(),
            status,
        })
    }

    pub fn expect_failure(self, step: &str, kind: FailureKind) -> Self {
        self.expect(Assertion::FailedWith {
            step: step.to_string(),
            kind,
        })
    }

    pub fn expect_skip_reason(self, step: &str, reason: &str) -> Self {
        self.expect(Assertion::SkippedBecause {
            step: step.to_string(),
            reason: reason.to_string(),
        })
    }

    pub fn expect_note(self, step: &str, text: &str) -> Self {
        self.expect(Assertion::NoteContains {
            step: step.to_string(),
            text: text.to_string(),
        })
    }

    pub fn expect_all_passed(self) -> Self {
        self.expect(Assertion::AllPassed)
    }

    pub fn expect_exit_code(self, code: i32) -> Self {
        self.expect(Assertion::ExitCode(code))
    }

    // ===== Execution =====

    /// Run the flow, then check every assertion in order.
    pub fn run(self) -> Result<RunReport> {
        let clock = MockClock::new();
        let auth_dependent = self.scenario.auth_dependent_count();
        let total = self.scenario.len();

        let mut ctx = ScenarioContext::new(self.credentials);
        if let Some(image) = self.image {
            ctx = ctx.with_image(image);
        }

        let results = ScenarioRunner::new(&self.api, &clock)
            .with_budget(self.budget)
            .run(self.scenario, &mut ctx);

        if results.len() != total {
            return Err(anyhow!(
                "flow {:?} recorded {} of {} steps",
                self.name,
                results.len(),
                total
            ));
        }

        let report = RunReport {
            results,
            ctx,
            api: self.api,
            clock,
            auth_dependent,
        };
        for assertion in &self.assertions {
            assertion
                .check(&report)
                .with_context(|| format!("flow {:?}: {:?}", self.name, assertion))?;
        }
        Ok(report)
    }
}

/// Everything a finished run leaves behind
pub struct RunReport {
    pub results: ResultAggregator,
    pub ctx: ScenarioContext,
    pub api: FakeApi,
    pub clock: MockClock,
    /// Steps in the flow that need an authenticated session
    pub auth_dependent: usize,
}

impl RunReport {
    pub fn step(&self, name: &str) -> Result<&StepResult> {
        self.results
            .results()
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow!("no step named {:?}", name))
    }

    pub fn outcomes(&self, outcome: StepOutcome) -> Vec<&str> {
        self.results
            .results()
            .iter()
            .filter(|r| r.outcome == outcome)
            .map(|r| r.name.as_str())
            .collect()
    }
}
