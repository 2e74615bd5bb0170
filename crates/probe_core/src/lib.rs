//! probe core library
//!
//! An end-to-end harness for the Granula REST API, providing:
//! - Session management with token rotation
//! - Redacted request recording and outcome classification
//! - A bounded submit-and-poll loop for long-running AI jobs
//! - Ordered scenarios with preconditions and auth-aware skipping
//! - Deterministic run summaries
//!
//! # Quick Start
//!
//! Any `Fn(&ApiRequest) -> Result<ApiResponse, TransportError>` is a
//! [`Transport`], which makes the harness easy to drive without a network:
//!
//! ```
//! use probe_core::{ApiRequest, ApiResponse, Expect, RequestRecorder, TransportError};
//!
//! let api = |_: &ApiRequest| -> Result<ApiResponse, TransportError> {
//!     Ok(ApiResponse::new(200, r#"{"data": {"status": "ok"}}"#))
//! };
//! let recorder = RequestRecorder::new(&api);
//!
//! let rec = recorder.execute(&ApiRequest::get("/health").unversioned(), &Expect::ok());
//! assert!(rec.passed());
//! assert_eq!(rec.require_str("status").unwrap(), "ok");
//! ```
//!
//! # Scenarios
//!
//! Steps share a [`ScenarioContext`]; the runner never aborts, it records:
//!
//! ```
//! use probe_core::{
//!     ApiRequest, ApiResponse, Credentials, Expect, Scenario, ScenarioContext,
//!     ScenarioRunner, Step, StepOutput, SystemClock, TransportError,
//! };
//!
//! let api = |_: &ApiRequest| -> Result<ApiResponse, TransportError> {
//!     Ok(ApiResponse::new(503, "maintenance"))
//! };
//! let clock = SystemClock::new();
//! let scenario = Scenario::new("smoke").step(
//!     Step::new("health", |env, _| {
//!         let rec = env.call_anonymous(ApiRequest::get("/health").unversioned(), &Expect::ok());
//!         StepOutput::from_recorded(&rec)
//!     })
//!     .public(),
//! );
//!
//! let mut ctx = ScenarioContext::new(Credentials::new("a@b.test", "pw", "A"));
//! let results = ScenarioRunner::new(&api, &clock).run(scenario, &mut ctx);
//! assert_eq!(results.summarize().failed, 1);
//! assert_eq!(results.exit_code(), 1);
//! ```

mod aggregator;
mod clock;
mod config;
mod context;
pub mod envelope;
mod error;
pub mod flow;
mod poller;
pub mod redact;
mod recorder;
mod runner;
mod session;
pub mod steps;
mod transport;
mod types;

#[cfg(test)]
mod testing;

pub use aggregator::{FailedStep, ResultAggregator, RunSummary};
pub use clock::{Clock, SystemClock};
pub use config::{
    ApiConfig, AssetsConfig, Config, PollConfig, UserConfig, BASE_URL_ENV, CONFIG_FILE,
};
pub use context::{ImageAsset, ScenarioContext};
pub use envelope::Collection;
pub use error::{AuthError, JobError, ProbeError, Result, TransportError};
pub use poller::{JobPoller, PollBudget};
pub use recorder::{
    describe_body, describe_response, Expect, Recorded, RequestRecorder, ResponseBody,
};
pub use runner::{
    auth_failure, Scenario, ScenarioRunner, Step, StepEnv, StepEvent, StepOutput, AUTH_UNAVAILABLE,
};
pub use session::SessionManager;
pub use transport::{
    ApiRequest, ApiResponse, FilePart, HttpTransport, Method, MultipartForm, RequestBody,
    Transport,
};
pub use types::*;
