//! Authentication flow.

use crate::RunOptions;
use anyhow::Result;
use probe_core::flow;
use std::process::ExitCode;

/// Register, rotate, change password, and revoke.
pub fn run(options: &RunOptions) -> Result<ExitCode> {
    super::execute(flow::auth_flow(), options, |_| Ok(()))
}
