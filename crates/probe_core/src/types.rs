//! Core data types for the harness.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Tokens and identity obtained from the auth surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Option<String>,
    pub email: String,
}

/// Login identity used by a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    /// Credentials with a unique email so every run registers a fresh user.
    pub fn unique(prefix: &str, domain: &str, password: &str, name: &str) -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        Self::new(
            &format!("{}_{}@{}", prefix, &tag[..12], domain),
            password,
            name,
        )
    }
}

/// The two classes of long-running AI job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobKind {
    /// Floor-plan image recognition.
    Recognition,
    /// Layout variant generation.
    Generation,
}

impl JobKind {
    /// Submission endpoint.
    pub fn submit_path(&self) -> &'static str {
        match self {
            JobKind::Recognition => "/ai/recognize",
            JobKind::Generation => "/ai/generate",
        }
    }

    /// Status endpoint for a job id.
    pub fn status_path(&self, job_id: &str) -> String {
        format!("{}/{}/status", self.submit_path(), job_id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Recognition => "recognition",
            JobKind::Generation => "generation",
        }
    }
}

/// Server-reported job status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// A status string outside the known vocabulary; treated as non-terminal.
    Unknown(String),
}

impl JobStatus {
    /// Parse a wire status. Unrecognized values become [`JobStatus::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => JobStatus::Queued,
            "processing" | "running" | "in_progress" => JobStatus::Processing,
            "completed" | "complete" | "done" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            _ => JobStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position along Queued -> Processing -> terminal. Unknown has no rank.
    pub(crate) fn rank(&self) -> Option<u8> {
        match self {
            JobStatus::Queued => Some(0),
            JobStatus::Processing => Some(1),
            JobStatus::Completed | JobStatus::Failed => Some(2),
            JobStatus::Unknown(_) => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("queued"),
            JobStatus::Processing => f.write_str("processing"),
            JobStatus::Completed => f.write_str("completed"),
            JobStatus::Failed => f.write_str("failed"),
            JobStatus::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

/// Client-side view of one submitted job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Advisory progress, 0-100.
    pub progress: u8,
    /// Payload delivered with Completed.
    pub result: Option<Value>,
    /// Message delivered with Failed.
    pub error: Option<String>,
    /// Status fetches issued so far.
    pub polls: u32,
}

impl JobHandle {
    pub fn new(job_id: String, kind: JobKind) -> Self {
        Self {
            job_id,
            kind,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            polls: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Threads multi-turn chat exchanges together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub context_id: String,
    pub scene_id: Option<String>,
    pub turn_count: u32,
}

/// Final state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Passed,
    Failed,
    Skipped,
}

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// No response: connection refused, timeout, DNS.
    Transport,
    /// A response arrived but lacked the expected JSON content.
    Protocol,
    /// Observed status differs from expected.
    StatusMismatch,
    /// Token refresh was rejected; dependent steps are skipped.
    AuthExpired,
    /// A polled job reached Failed.
    JobFailed,
    /// A polled job ran out of attempts.
    JobTimeout,
    /// A required input (fixture, earlier id) was unavailable inside the step.
    Precondition,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Transport => "transport",
            FailureKind::Protocol => "protocol",
            FailureKind::StatusMismatch => "status mismatch",
            FailureKind::AuthExpired => "auth expired",
            FailureKind::JobFailed => "job failed",
            FailureKind::JobTimeout => "job timeout",
            FailureKind::Precondition => "precondition",
        };
        f.write_str(label)
    }
}

/// Classified failure with a short reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }
}

/// Recorded outcome of one step. Immutable once handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    pub duration_ms: u64,
    pub failure: Option<Failure>,
    /// Skip reason, or an informational note on success.
    pub note: Option<String>,
}

impl StepResult {
    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome: StepOutcome::Skipped,
            expected_status: None,
            actual_status: None,
            duration_ms: 0,
            failure: None,
            note: Some(reason.into()),
        }
    }

    /// Short reason for reports.
    pub fn reason(&self) -> String {
        match (&self.failure, &self.note) {
            (Some(failure), _) => format!("{}: {}", failure.kind, failure.message),
            (None, Some(note)) => note.clone(),
            (None, None) => String::new(),
        }
    }
}
