// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sink;

// ---- Re-exports for a stable public API ----
pub use crate::config::Config;
pub use crate::error::{ConfigError, PipelineError};
pub use crate::pipeline::{run_job, Job};
pub use crate::report::{RunStatus, RunSummary};
