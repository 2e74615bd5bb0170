//! probe - end-to-end checks for the Granula API.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use probe_core::{ProbeError, CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;

mod assets;
mod commands;
mod report;
mod setup;

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "End-to-end scenario runner for the Granula API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: RunOptions,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full user flow (default)
    Run,
    /// Run the authentication flow, negative cases included
    Auth,
    /// Upload a floor plan and follow its recognition job
    Recognize,
}

/// Options shared by every scenario command.
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Config file; missing means built-in defaults
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// API host, e.g. https://api.example.com (overrides config and PROBE_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory holding floor-plan images
    #[arg(long, global = true)]
    pub images_dir: Option<PathBuf>,

    /// Seconds between job status polls
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Status polls per job before timing out
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Log every request and response (redacted)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; --verbose raises the default from warn to debug
    let default = if verbose { "probe_core=debug,probe=debug,warn" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    let outcome: Result<ExitCode> = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&cli.options),
        Commands::Auth => commands::auth::run(&cli.options),
        Commands::Recognize => commands::recognize::run(&cli.options),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            if let Some(hint) = err
                .downcast_ref::<ProbeError>()
                .and_then(ProbeError::recovery_suggestion)
            {
                eprintln!("  {} {}", style("hint:").cyan(), hint);
            }
            ExitCode::from(2)
        }
    }
}
