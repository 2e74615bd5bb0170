//! Submit-and-poll state machine for long-running AI jobs.
//!
//! A job moves `Queued -> Processing -> {Completed, Failed}`; fast jobs may
//! jump from `Queued` straight to a terminal state. Once terminal, a
//! [`JobHandle`] is frozen: [`JobPoller::poll`] returns without issuing a
//! request.
//!
//! The poller is deliberately lenient about what the server reports while a
//! job runs. Progress may go backwards, status strings outside the known
//! vocabulary map to [`JobStatus::Unknown`] and keep the loop going, and a
//! poll that fails in transit only spends one attempt. The attempt budget is
//! the single thing that ends a non-terminal wait.

use crate::clock::Clock;
use crate::envelope;
use crate::error::JobError;
use crate::recorder::{Expect, RequestRecorder};
use crate::transport::ApiRequest;
use crate::types::{JobHandle, JobKind, JobStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempt/interval budget for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollBudget {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping: `interval * max_attempts`.
    pub fn total(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Drives jobs to a terminal state.
#[derive(Clone, Copy)]
pub struct JobPoller<'a> {
    recorder: RequestRecorder<'a>,
    clock: &'a dyn Clock,
}

impl<'a> JobPoller<'a> {
    pub fn new(recorder: RequestRecorder<'a>, clock: &'a dyn Clock) -> Self {
        Self { recorder, clock }
    }

    /// Submit a job and return a handle in the Queued state.
    pub fn submit(
        &self,
        kind: JobKind,
        payload: Value,
        auth: Option<&str>,
    ) -> Result<JobHandle, JobError> {
        let request = ApiRequest::post(kind.submit_path())
            .auth(auth)
            .json(payload);
        let rec = self
            .recorder
            .execute(&request, &Expect::ok().or(201).or(202));

        if let Some(failure) = rec.failure {
            return Err(JobError::SubmitRejected {
                status: rec.actual_status,
                message: failure.message,
            });
        }

        let job_id = rec
            .payload()
            .and_then(|p| envelope::first_str_field(p, &["job_id", "id"]))
            .ok_or(JobError::MissingJobId)?;

        info!(kind = kind.label(), job_id = %job_id, "job submitted");
        Ok(JobHandle::new(job_id, kind))
    }

    /// Fetch the job status once and fold it into `handle`.
    ///
    /// A terminal handle is returned as-is without contacting the server.
    pub fn poll(&self, handle: &mut JobHandle, auth: Option<&str>) -> Result<(), JobError> {
        if handle.is_terminal() {
            return Ok(());
        }

        let request = ApiRequest::get(handle.kind.status_path(&handle.job_id)).auth(auth);
        handle.polls += 1;
        let rec = self.recorder.execute(&request, &Expect::ok());

        if let Some(failure) = rec.failure {
            return Err(JobError::PollFailed(failure.message));
        }
        let payload = rec
            .payload()
            .ok_or_else(|| JobError::PollFailed("status response is not JSON".to_string()))?;

        apply_status(handle, payload);
        Ok(())
    }

    /// Poll until the job is terminal or `budget` is spent.
    ///
    /// Sleeps `budget.interval` between non-terminal polls, never after the
    /// last one, so a job that never finishes costs exactly
    /// `budget.max_attempts` polls and `max_attempts - 1` intervals.
    /// No cancellation is sent on timeout; the protocol is poll-only.
    pub fn await_terminal(
        &self,
        handle: &mut JobHandle,
        budget: PollBudget,
        auth: Option<&str>,
    ) -> Result<(), JobError> {
        if handle.is_terminal() {
            return terminal_result(handle);
        }

        let started = self.clock.now();
        for attempt in 1..=budget.max_attempts {
            if let Err(err) = self.poll(handle, auth) {
                warn!(
                    job_id = %handle.job_id,
                    attempt,
                    error = %err,
                    "poll attempt failed; continuing"
                );
            } else {
                info!(
                    job_id = %handle.job_id,
                    attempt,
                    max_attempts = budget.max_attempts,
                    status = %handle.status,
                    progress = handle.progress,
                    "job status"
                );
            }

            if handle.is_terminal() {
                return terminal_result(handle);
            }
            if attempt < budget.max_attempts {
                self.clock.sleep(budget.interval);
            }
        }

        Err(JobError::Timeout {
            job_id: handle.job_id.clone(),
            attempts: budget.max_attempts,
            elapsed: self.clock.now().saturating_sub(started),
        })
    }
}

fn apply_status(handle: &mut JobHandle, payload: &Value) {
    let raw = payload
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let status = JobStatus::parse(raw);

    if let JobStatus::Unknown(raw) = &status {
        warn!(
            job_id = %handle.job_id,
            status = %raw,
            "unrecognized job status; treating as in progress"
        );
    }

    match (handle.status.rank(), status.rank()) {
        (Some(old), Some(new)) if new < old => {
            debug!(
                job_id = %handle.job_id,
                from = %handle.status,
                to = %status,
                "ignoring backwards status"
            );
        }
        _ => handle.status = status,
    }

    if let Some(progress) = payload.get("progress").and_then(Value::as_f64) {
        let progress = progress.clamp(0.0, 100.0).round() as u8;
        if progress < handle.progress {
            debug!(
                job_id = %handle.job_id,
                from = handle.progress,
                to = progress,
                "progress went backwards"
            );
        }
        handle.progress = progress;
    }

    match handle.status {
        JobStatus::Completed => {
            handle.result = Some(completed_result(payload));
            handle.progress = handle.progress.max(100);
        }
        JobStatus::Failed => {
            handle.error = Some(
                envelope::error_message(payload).unwrap_or_else(|| "unknown error".to_string()),
            );
        }
        _ => {}
    }
}

/// Result payload of a completed job: `result` when present, else the whole
/// status payload (scene/variants live at the top level on some deployments).
fn completed_result(payload: &Value) -> Value {
    match payload.get("result") {
        Some(result) if !result.is_null() => result.clone(),
        _ => payload.clone(),
    }
}

fn terminal_result(handle: &JobHandle) -> Result<(), JobError> {
    match handle.status {
        JobStatus::Failed => Err(JobError::Failed {
            job_id: handle.job_id.clone(),
            message: handle
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }),
        _ => Ok(()),
    }
}
