// src/pipeline/email.rs
use chrono::Utc;

use crate::config::EmailSettings;
use crate::error::PipelineError;
use crate::ingest::take_capped;
use crate::ingest::types::EmailSource;
use crate::normalize::{EmailRecord, EMAIL_KEY_COLUMN};
use crate::report::RunSummary;
use crate::sink::{ingest_batch, RowStore};

/// Fetch → normalize → ingest for the email job. Counts land in `summary`
/// even when a later stage fails.
pub async fn run(
    source: &dyn EmailSource,
    store: &dyn RowStore,
    settings: &EmailSettings,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    tracing::info!(
        target: "pipeline",
        provider = source.name(),
        sender = %settings.sender,
        cap = settings.max_results,
        "fetching emails"
    );
    let raw = source
        .fetch_from_sender(&settings.sender, settings.max_results)
        .await
        .map_err(|e| PipelineError::fetch(source.name(), e))?;

    let (raw, dropped) = take_capped(raw, settings.max_results);
    if dropped > 0 {
        tracing::warn!(target: "pipeline", dropped, "source returned more than the cap");
    }
    summary.fetched = raw.len();
    if raw.is_empty() {
        tracing::info!(target: "pipeline", "no emails from sender");
        return Ok(());
    }

    let now = Utc::now();
    let rows: Vec<_> = raw
        .into_iter()
        .map(|r| EmailRecord::from_raw(r, &settings.pipeline_name, now).to_row())
        .collect();

    match ingest_batch(store, &settings.table, EMAIL_KEY_COLUMN, &rows).await {
        Ok(stats) => {
            summary.record_ingest(stats);
            Ok(())
        }
        Err(aborted) => {
            summary.record_ingest(aborted.stats);
            Err(aborted.into())
        }
    }
}
