//! Console rendering of a run.

use chrono::Local;
use console::style;
use probe_core::{RunSummary, StepOutcome, StepResult};

pub fn header(scenario: &str, base_url: &str, email: &str) {
    println!("{}", style(format!("probe: {}", scenario)).bold());
    println!("  API:     {}", style(base_url).cyan());
    println!("  User:    {}", email);
    println!("  Started: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();
}

fn status_pair(result: &StepResult) -> Option<String> {
    match (result.expected_status, result.actual_status) {
        (Some(expected), Some(actual)) if expected != actual => {
            Some(format!("{} (expected {})", actual, expected))
        }
        (_, Some(actual)) => Some(actual.to_string()),
        (Some(expected), None) if result.outcome == StepOutcome::Failed => {
            Some(format!("no response (expected {})", expected))
        }
        _ => None,
    }
}

/// One line per finished step.
pub fn step_line(result: &StepResult) -> String {
    let mark = match result.outcome {
        StepOutcome::Passed => style("✓").green(),
        StepOutcome::Failed => style("×").red(),
        StepOutcome::Skipped => style("-").yellow(),
    };
    let mut line = format!("{} {}", mark, result.name);
    if let Some(status) = status_pair(result) {
        line.push_str(&format!(" [{}]", status));
    }
    if result.outcome != StepOutcome::Skipped {
        line.push_str(&format!(" {}ms", result.duration_ms));
    }
    let reason = result.reason();
    if !reason.is_empty() {
        let reason = match result.outcome {
            StepOutcome::Failed => style(reason).red(),
            _ => style(reason).dim(),
        };
        line.push_str(&format!(" {}", reason));
    }
    line
}

pub fn summary(summary: &RunSummary) {
    println!();
    println!("{}", style("Summary:").bold());
    println!("  Passed:  {}", style(summary.passed).green());
    println!(
        "  Failed:  {}",
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).green()
        }
    );
    println!("  Skipped: {}", style(summary.skipped).yellow());
    println!("  Total:   {}", summary.total);

    if !summary.failures.is_empty() {
        println!();
        println!("{}", style("Failures:").red().bold());
        for failure in &summary.failures {
            println!("  {} {}: {}", style("×").red(), failure.name, failure.reason);
        }
    }
}
