//! Full user flow.

use crate::RunOptions;
use anyhow::Result;
use probe_core::flow;
use std::process::ExitCode;

/// Run every phase, from registration to logout.
pub fn run(options: &RunOptions) -> Result<ExitCode> {
    super::execute(flow::full_user_flow(), options, |_| Ok(()))
}
