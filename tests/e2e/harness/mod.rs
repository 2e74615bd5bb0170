//! E2E test harness for probe.
//!
//! Flows run against an in-process fake of the Granula API under virtual
//! time. Some builders and variants are only used by a subset of scenarios.

#![allow(dead_code)]

pub mod assertions;
pub mod run;
pub mod workspace;

pub use assertions::Assertion;
pub use clock::MockClock;
pub use fake_api::FakeApi;
pub use run::{plan_image, FlowRun, RunReport};
pub use workspace::TestWorkspace;
