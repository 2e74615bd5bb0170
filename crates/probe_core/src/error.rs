//! Error types for probe_core operations.

use std::time::Duration;
use thiserror::Error;

/// Core error type for harness setup and configuration.
///
/// Failures that happen while a scenario is running never surface as
/// `ProbeError`; they are classified into [`crate::FailureKind`] and recorded
/// against the step that produced them.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be constructed.
    #[error("transport setup failed: {0}")]
    TransportSetup(String),

    /// A request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProbeError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ConfigError(_) => {
                Some("Check probe.toml, or delete it to fall back to the built-in defaults.")
            }
            Self::TransportSetup(_) => {
                Some("Verify the base URL (--base-url or PROBE_BASE_URL) is a valid http(s) URL.")
            }
            Self::Transport(TransportError::Connect(_)) => {
                Some("Is the API reachable? Try `curl <base-url>/health`.")
            }
            _ => None,
        }
    }
}

/// A request that failed before an HTTP status was observed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, or DNS failure.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The per-request timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be built or the body could not be read.
    #[error("request failed: {0}")]
    Other(String),
}

/// Failures of the authentication surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Registration hit an existing account (409).
    #[error("email already registered")]
    DuplicateEmail,

    /// The server rejected the submitted fields.
    #[error("validation failed ({status}): {message}")]
    Validation {
        /// Observed status code
        status: u16,
        /// Server-provided message
        message: String,
    },

    /// Wrong email or password (401 on login).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The refresh token was rejected (401 on refresh).
    #[error("refresh token rejected")]
    InvalidRefreshToken,

    /// No refresh token is held locally; nothing was sent.
    #[error("no refresh token held")]
    MissingRefreshToken,

    /// A success status arrived without both tokens.
    #[error("auth response missing {0}")]
    MalformedTokens(&'static str),

    /// Any other status.
    #[error("unexpected status {status}")]
    Unexpected {
        /// Observed status code
        status: u16,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AuthError {
    /// Status code the server answered with, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::DuplicateEmail => Some(409),
            Self::InvalidCredentials | Self::InvalidRefreshToken => Some(401),
            Self::Validation { status, .. } | Self::Unexpected { status } => Some(*status),
            Self::MalformedTokens(_) | Self::MissingRefreshToken | Self::Transport(_) => None,
        }
    }
}

/// Failures of a long-running job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The submission request did not return the expected status.
    #[error("job submission rejected ({status:?}): {message}")]
    SubmitRejected {
        /// Observed status code, absent on transport failure
        status: Option<u16>,
        /// Reason
        message: String,
    },

    /// The submission succeeded but carried no job id.
    #[error("job submission returned no job id")]
    MissingJobId,

    /// A single status fetch failed; the poll loop treats this as a spent attempt.
    #[error("status poll failed: {0}")]
    PollFailed(String),

    /// The job reached the Failed state.
    #[error("job {job_id} failed: {message}")]
    Failed {
        /// Job identifier
        job_id: String,
        /// Server-provided error message
        message: String,
    },

    /// The attempt budget ran out before a terminal state.
    #[error("job {job_id} still running after {attempts} polls ({}s)", elapsed.as_secs())]
    Timeout {
        /// Job identifier
        job_id: String,
        /// Number of polls issued
        attempts: u32,
        /// Time spent waiting
        elapsed: Duration,
    },
}

/// Convenience Result type for probe_core operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
