//! CLI commands.

pub mod auth;
pub mod recognize;
pub mod run;

use crate::{report, setup, RunOptions};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use probe_core::{Scenario, ScenarioContext, ScenarioRunner, StepEvent, SystemClock};
use std::process::ExitCode;
use std::time::Duration;

/// Run `scenario` against the configured API and print the report.
///
/// The exit code is 0 when no step failed and 1 otherwise.
pub(crate) fn execute(
    scenario: Scenario,
    options: &RunOptions,
    prepare: impl FnOnce(&ScenarioContext) -> Result<()>,
) -> Result<ExitCode> {
    let config = setup::load_config(options)?;
    let transport = setup::transport(&config)?;
    let mut ctx = setup::context(&config)?;
    prepare(&ctx)?;

    report::header(scenario.name(), &config.api.base_url, &ctx.credentials.email);

    // Spinner and debug logs share stderr
    let pb = if options.verbose {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let clock = SystemClock::new();
    let runner = ScenarioRunner::new(&transport, &clock).with_budget(config.poll.budget());
    let results = runner.run_with_progress(scenario, &mut ctx, &mut |event| match event {
        StepEvent::Started { index, total, name } => {
            pb.set_message(format!("[{}/{}] {}", index + 1, total, name));
        }
        StepEvent::Finished(result) => pb.println(report::step_line(result)),
    });
    pb.finish_and_clear();

    let summary = results.summarize();
    report::summary(&summary);
    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(ExitCode::from(results.exit_code() as u8))
}
