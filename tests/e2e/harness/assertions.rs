use super::run::RunReport;
use anyhow::{bail, Result};
use probe_core::{FailureKind, StepOutcome};

/// Declarative assertions on a finished run
pub enum Assertion {
    // Per-step
    Outcome { step: String, outcome: StepOutcome },
    Status { step: String, status: u16 },
    FailedWith { step: String, kind: FailureKind },
    SkippedBecause { step: String, reason: String },
    NoteContains { step: String, text: String },

    // Whole run
    Passed(usize),
    Failed(usize),
    Skipped(usize),
    AllPassed,
    ExitCode(i32),

    // Custom
    Custom(Box<dyn Fn(&RunReport) -> Result<()>>),
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outcome { step, outcome } => write!(f, "Outcome({:?}, {:?})", step, outcome),
            Self::Status { step, status } => write!(f, "Status({:?}, {})", step, status),
            Self::FailedWith { step, kind } => write!(f, "FailedWith({:?}, {:?})", step, kind),
            Self::SkippedBecause { step, reason } => {
                write!(f, "SkippedBecause({:?}, {:?})", step, reason)
            }
            Self::NoteContains { step, text } => write!(f, "NoteContains({:?}, {:?})", step, text),
            Self::Passed(n) => write!(f, "Passed({})", n),
            Self::Failed(n) => write!(f, "Failed({})", n),
            Self::Skipped(n) => write!(f, "Skipped({})", n),
            Self::AllPassed => write!(f, "AllPassed"),
            Self::ExitCode(code) => write!(f, "ExitCode({})", code),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

impl Assertion {
    pub fn check(&self, report: &RunReport) -> Result<()> {
        let summary = report.results.summarize();
        match self {
            Self::Outcome { step, outcome } => {
                let result = report.step(step)?;
                if result.outcome != *outcome {
                    bail!(
                        "step {:?}: expected {:?}, got {:?} ({})",
                        step,
                        outcome,
                        result.outcome,
                        result.reason()
                    );
                }
            }
            Self::Status { step, status } => {
                let result = report.step(step)?;
                if result.actual_status != Some(*status) {
                    bail!(
                        "step {:?}: expected status {}, got {:?}",
                        step,
                        status,
                        result.actual_status
                    );
                }
            }
            Self::FailedWith { step, kind } => {
                let result = report.step(step)?;
                let actual = result.failure.as_ref().map(|f| f.kind);
                if result.outcome != StepOutcome::Failed || actual != Some(*kind) {
                    bail!(
                        "step {:?}: expected failure {:?}, got {:?} / {:?}",
                        step,
                        kind,
                        result.outcome,
                        actual
                    );
                }
            }
            Self::SkippedBecause { step, reason } => {
                let result = report.step(step)?;
                if result.outcome != StepOutcome::Skipped || result.reason() != *reason {
                    bail!(
                        "step {:?}: expected skip {:?}, got {:?} ({})",
                        step,
                        reason,
                        result.outcome,
                        result.reason()
                    );
                }
            }
            Self::NoteContains { step, text } => {
                let result = report.step(step)?;
                let note = result.note.as_deref().unwrap_or_default();
                if !note.contains(text.as_str()) {
                    bail!("step {:?}: note {:?} lacks {:?}", step, note, text);
                }
            }
            Self::Passed(n) => {
                if summary.passed != *n {
                    bail!("expected {} passed, got {}", n, summary.passed);
                }
            }
            Self::Failed(n) => {
                if summary.failed != *n {
                    bail!(
                        "expected {} failed, got {}: {:?}",
                        n,
                        summary.failed,
                        summary.failures
                    );
                }
            }
            Self::Skipped(n) => {
                if summary.skipped != *n {
                    bail!("expected {} skipped, got {}", n, summary.skipped);
                }
            }
            Self::AllPassed => {
                if summary.passed != summary.total {
                    bail!(
                        "{} of {} steps passed; failures {:?}, {} skipped",
                        summary.passed,
                        summary.total,
                        summary.failures,
                        summary.skipped
                    );
                }
            }
            Self::ExitCode(code) => {
                if report.results.exit_code() != *code {
                    bail!("expected exit code {}, got {}", code, report.results.exit_code());
                }
            }
            Self::Custom(check) => check(report)?,
        }
        Ok(())
    }
}
