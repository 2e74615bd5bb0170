//! Recognition debug flow.

use crate::RunOptions;
use anyhow::{bail, Result};
use console::style;
use probe_core::flow;
use std::process::ExitCode;

/// Upload a floor plan and poll its recognition job.
///
/// Unlike the full flow, a missing image is an error: nothing would run.
pub fn run(options: &RunOptions) -> Result<ExitCode> {
    super::execute(flow::recognition_flow(), options, |ctx| {
        match &ctx.image {
            Some(image) => {
                println!(
                    "{} Using {} ({} KB base64)",
                    style("→").cyan(),
                    image.file_name,
                    image.base64.len() / 1024
                );
                Ok(())
            }
            None => bail!("no .jpg/.png image found; pass --images-dir"),
        }
    })
}
