//! Executes single API calls and classifies what came back.

use crate::envelope;
use crate::redact;
use crate::transport::{ApiRequest, Method, RequestBody, Transport};
use crate::types::{Failure, FailureKind};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Accepted status codes for a call. The first one is reported as expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expect(Vec<u16>);

impl Expect {
    pub fn status(code: u16) -> Self {
        Self(vec![code])
    }

    /// Also accept `code`.
    pub fn or(mut self, code: u16) -> Self {
        self.0.push(code);
        self
    }

    pub fn ok() -> Self {
        Self::status(200)
    }

    pub fn created() -> Self {
        Self::status(201)
    }

    pub fn primary(&self) -> u16 {
        self.0.first().copied().unwrap_or(200)
    }

    pub fn matches(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    /// Non-JSON text, truncated.
    Raw(String),
    Empty,
}

/// Everything observed about one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub expected_status: u16,
    pub actual_status: Option<u16>,
    pub body: ResponseBody,
    pub failure: Option<Failure>,
    pub elapsed: Duration,
}

impl Recorded {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Full JSON body, if the response was JSON.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Envelope-unwrapped payload.
    pub fn payload(&self) -> Option<&Value> {
        self.json().map(envelope::payload)
    }

    /// A required string field of the payload, or a protocol failure.
    pub fn require_str(&self, key: &str) -> Result<String, Failure> {
        self.payload()
            .and_then(|payload| envelope::str_field(payload, key))
            .ok_or_else(|| Failure::protocol(format!("response has no `{}`", key)))
    }

    /// Normalized list view of the body.
    pub fn collection(&self) -> envelope::Collection {
        self.json()
            .map(envelope::Collection::from_body)
            .unwrap_or_default()
    }
}

/// Performs calls through a [`Transport`] and produces redacted records.
#[derive(Clone, Copy)]
pub struct RequestRecorder<'a> {
    transport: &'a dyn Transport,
}

impl<'a> RequestRecorder<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Send `request` and classify the outcome against `expect`.
    ///
    /// Never fails: transport errors, unexpected statuses, and non-JSON bodies
    /// are all folded into the returned [`Recorded`].
    pub fn execute(&self, request: &ApiRequest, expect: &Expect) -> Recorded {
        let auth = match request.bearer.as_deref() {
            Some(token) => redact::redact_header("Authorization", &format!("Bearer {}", token)),
            None => "-".to_string(),
        };
        debug!(
            method = %request.method,
            path = %request.path,
            auth = %auth,
            body = %describe_body(&request.body),
            "request"
        );

        let started = Instant::now();
        let sent = self.transport.send(request);
        let elapsed = started.elapsed();

        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "transport failure"
                );
                return Recorded {
                    method: request.method,
                    path: request.path.clone(),
                    expected_status: expect.primary(),
                    actual_status: None,
                    body: ResponseBody::Empty,
                    failure: Some(Failure::new(FailureKind::Transport, err.to_string())),
                    elapsed,
                };
            }
        };

        let body = decode_body(&response.body);
        debug!(
            status = response.status,
            elapsed_ms = elapsed.as_millis() as u64,
            body = %describe_response(&body),
            "response"
        );

        let failure = if expect.matches(response.status) {
            None
        } else {
            let detail = match &body {
                ResponseBody::Json(value) => envelope::error_message(value),
                _ => None,
            };
            let message = match detail {
                Some(detail) => format!(
                    "expected {}, got {} ({})",
                    expect.primary(),
                    response.status,
                    detail
                ),
                None => format!("expected {}, got {}", expect.primary(), response.status),
            };
            warn!(method = %request.method, path = %request.path, "{}", message);
            Some(Failure::new(FailureKind::StatusMismatch, message))
        };

        Recorded {
            method: request.method,
            path: request.path.clone(),
            expected_status: expect.primary(),
            actual_status: Some(response.status),
            body,
            failure,
            elapsed,
        }
    }
}

fn decode_body(text: &str) -> ResponseBody {
    if text.trim().is_empty() {
        return ResponseBody::Empty;
    }
    match serde_json::from_str(text) {
        Ok(value) => ResponseBody::Json(value),
        Err(_) => {
            debug!("response body is not JSON; keeping raw text");
            ResponseBody::Raw(redact::truncate(text, redact::RAW_BODY_LIMIT))
        }
    }
}

/// Redacted, loggable rendering of a request body.
pub fn describe_body(body: &RequestBody) -> String {
    match body {
        RequestBody::Empty => "-".to_string(),
        RequestBody::Json(value) => redact::truncate(
            &redact::redact_value(value).to_string(),
            redact::RAW_BODY_LIMIT,
        ),
        RequestBody::Multipart(form) => {
            let fields: Vec<String> = form
                .fields
                .iter()
                .map(|(name, value)| {
                    let shown = if redact::is_secret_key(name) {
                        redact::PLACEHOLDER.to_string()
                    } else {
                        redact::mask_opaque(value)
                    };
                    format!("{}={}", name, shown)
                })
                .collect();
            match &form.file {
                Some(file) => format!(
                    "multipart[{}; {}={} ({}, {} bytes)]",
                    fields.join(", "),
                    file.field,
                    file.file_name,
                    file.mime,
                    file.bytes.len()
                ),
                None => format!("multipart[{}]", fields.join(", ")),
            }
        }
    }
}

/// Redacted, loggable rendering of a response body.
pub fn describe_response(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Json(value) => redact::truncate(
            &redact::redact_value(value).to_string(),
            redact::RAW_BODY_LIMIT,
        ),
        ResponseBody::Raw(text) => redact::mask_text(text),
        ResponseBody::Empty => "-".to_string(),
    }
}
