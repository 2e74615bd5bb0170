//! Test doubles shared by unit tests.

use crate::clock::Clock;
use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

/// Replays queued responses in order and remembers every request.
///
/// Once the queue is empty, the last response pushed with
/// [`ScriptedTransport::repeat_json`] (if any) is served forever.
pub struct ScriptedTransport {
    queue: RefCell<VecDeque<Result<ApiResponse, TransportError>>>,
    fallback: RefCell<Option<ApiResponse>>,
    sent: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            fallback: RefCell::new(None),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<ApiResponse, TransportError>) {
        self.queue.borrow_mut().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(Ok(ApiResponse::json(status, &body)));
    }

    pub fn push_err(&self, err: TransportError) {
        self.push(Err(err));
    }

    pub fn repeat_json(&self, status: u16, body: Value) {
        *self.fallback.borrow_mut() = Some(ApiResponse::json(status, &body));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.sent.borrow_mut().push(request.clone());
        if let Some(next) = self.queue.borrow_mut().pop_front() {
            return next;
        }
        match self.fallback.borrow().as_ref() {
            Some(response) => Ok(response.clone()),
            None => Err(TransportError::Other(format!(
                "no scripted response for {} {}",
                request.method, request.path
            ))),
        }
    }
}

/// Virtual clock: `sleep` advances `now` instantly.
pub struct FakeClock {
    now: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.now.set(self.now.get() + duration);
    }
}
