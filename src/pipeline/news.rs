// src/pipeline/news.rs
use chrono::Utc;
use metrics::counter;

use crate::config::NewsSettings;
use crate::enrich::Enricher;
use crate::error::PipelineError;
use crate::ingest::take_capped;
use crate::ingest::types::NewsSource;
use crate::normalize::{NewsItemRecord, NEWS_KEY_COLUMN};
use crate::report::RunSummary;
use crate::sink::{ingest_batch, RowStore};

/// Fetch → enrich → normalize → ingest for the news job.
///
/// `fallback` is consulted only when `primary` succeeds with zero headlines;
/// a `primary` error is fatal. Items whose enrichment fails are stored
/// without `generated_text`.
pub async fn run(
    primary: &dyn NewsSource,
    fallback: Option<&dyn NewsSource>,
    enricher: &dyn Enricher,
    store: &dyn RowStore,
    settings: &NewsSettings,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    let limit = settings.top_n;
    tracing::info!(target: "pipeline", provider = primary.name(), limit, "fetching headlines");
    let mut raw = primary
        .fetch_top(limit)
        .await
        .map_err(|e| PipelineError::fetch(primary.name(), e))?;

    if raw.is_empty() {
        if let Some(fb) = fallback {
            tracing::info!(target: "pipeline", provider = fb.name(), "no headlines; falling back");
            raw = fb
                .fetch_top(limit)
                .await
                .map_err(|e| PipelineError::fetch(fb.name(), e))?;
        }
    }

    let (raw, dropped) = take_capped(raw, limit);
    if dropped > 0 {
        tracing::warn!(target: "pipeline", dropped, "source returned more than the cap");
    }
    summary.fetched = raw.len();
    if raw.is_empty() {
        tracing::warn!(target: "pipeline", "no headlines from any source");
        return Ok(());
    }

    let now = Utc::now();
    let mut rows = Vec::with_capacity(raw.len());
    for article in raw {
        // one generative request in flight at a time
        let generated = match enricher
            .caption(&article.headline, article.description.as_deref())
            .await
        {
            Ok(text) => {
                summary.enriched_ok += 1;
                Some(text)
            }
            Err(e) => {
                tracing::warn!(
                    target: "pipeline",
                    provider = enricher.provider_name(),
                    headline = %article.headline,
                    error = %e,
                    "enrichment failed; storing without generated text"
                );
                summary.enriched_failed += 1;
                counter!("enrich_failed_total").increment(1);
                None
            }
        };
        rows.push(NewsItemRecord::from_article(article, generated, now).to_row());
    }

    match ingest_batch(store, &settings.table, NEWS_KEY_COLUMN, &rows).await {
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
