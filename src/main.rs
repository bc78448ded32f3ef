//! daily-pipelines binary entrypoint.
//! Loads `.env`, parses the CLI, builds the config once, and runs one job.
//! The exit status tells the scheduler whether the run failed.

use std::process::ExitCode;

use clap::Parser;
use daily_pipelines::cli::CliArgs;
use daily_pipelines::{logging, run_job, Config, PipelineError, RunSummary};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    logging::init();

    let args = CliArgs::parse();
    let job = args.command.job();

    let config = match Config::from_env(job) {
        Ok(c) => c,
        Err(e) => {
            let mut summary = RunSummary::start(job);
            summary.finish(Some(&PipelineError::from(e)));
            summary.emit();
            return ExitCode::FAILURE;
        }
    };

    let summary = run_job(&config, args.dry_run).await;
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
