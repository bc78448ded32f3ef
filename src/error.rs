//! Error taxonomy for a pipeline run.
//!
//! Fatal errors (`PipelineError`) abort the run and end in a nonzero exit.
//! Recoverable ones never reach this type: a failed enrichment is absorbed
//! per item (`enrich::EnrichError`) and a duplicate row is an
//! `InsertOutcome::AlreadyPresent`, not an error at all.

use crate::sink::SinkAborted;

/// Configuration-related errors, raised before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load news sources: {0}")]
    Sources(String),
}

/// Run-level failure. Any of these ends the run with status `failure`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Startup failed: {0}")]
    Startup(String),

    #[error("Fetch from {provider} failed: {reason}")]
    Fetch { provider: String, reason: String },

    #[error("Sink error: {0}")]
    Sink(#[from] SinkAborted),
}

impl PipelineError {
    /// Wrap a source adapter failure, keeping the full anyhow context chain.
    pub fn fetch(provider: &str, err: anyhow::Error) -> Self {
        Self::Fetch {
            provider: provider.to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// Short stage label used in the run report.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Startup(_) => "startup",
            Self::Fetch { .. } => "fetch",
            Self::Sink(_) => "sink",
        }
    }
}
