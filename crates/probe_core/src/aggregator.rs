//! Step outcome collection and run summaries.

use crate::types::{FailureKind, StepOutcome, StepResult};
use serde::{Deserialize, Serialize};

/// One failed step as listed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    pub name: String,
    pub kind: Option<FailureKind>,
    pub reason: String,
}

/// Totals of a run plus its failures in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub failures: Vec<FailedStep>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Append-only record of step results.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: Vec<StepResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Merge results of a later run, keeping order.
    pub fn extend(&mut self, other: ResultAggregator) {
        self.results.extend(other.results);
    }

    pub fn summarize(&self) -> RunSummary {
        let count = |outcome| self.results.iter().filter(|r| r.outcome == outcome).count();
        RunSummary {
            passed: count(StepOutcome::Passed),
            failed: count(StepOutcome::Failed),
            skipped: count(StepOutcome::Skipped),
            total: self.results.len(),
            failures: self
                .results
                .iter()
                .filter(|r| r.outcome == StepOutcome::Failed)
                .map(|r| FailedStep {
                    name: r.name.clone(),
                    kind: r.failure.as_ref().map(|f| f.kind),
                    reason: r.reason(),
                })
                .collect(),
        }
    }

    /// 0 when no step failed, 1 otherwise. Skips do not count as failures.
    pub fn exit_code(&self) -> i32 {
        if self.results.iter().any(|r| r.outcome == StepOutcome::Failed) {
            1
        } else {
            0
        }
    }
}
