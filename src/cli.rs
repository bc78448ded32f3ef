use clap::{Parser, Subcommand};

use crate::pipeline::Job;

/// Scheduled batch jobs that archive mail and caption headlines into Supabase.
///
/// Each invocation runs one job to completion and exits nonzero on failure.
#[derive(Parser, Debug)]
#[command(name = "daily-pipelines", version)]
pub struct CliArgs {
    /// Write to an in-memory store instead of Supabase
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Archive messages from TARGET_EMAIL into the emails table
    Email,
    /// Caption today's top headlines into the news table
    News,
}

impl Command {
    pub fn job(self) -> Job {
        match self {
            Self::Email => Job::Email,
            Self::News => Job::News,
        }
    }
}
