//! The two jobs and the runner that wires real adapters into them.

pub mod email;
pub mod news;

use reqwest::Client;

use crate::config::{Config, JobConfig};
use crate::enrich::GeminiEnricher;
use crate::error::PipelineError;
use crate::ingest::providers::{gmail::GmailSource, newsapi::NewsApiSource, rss::RssSource};
use crate::ingest::types::NewsSource;
use crate::report::{self, RunSummary};
use crate::sink::{MemoryStore, PostgrestStore, RowStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Email,
    News,
}

impl Job {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::News => "news",
        }
    }
}

/// Run the configured job once and report it. The returned summary tells the
/// caller which exit status to use.
///
/// `dry_run` swaps the remote store for an in-memory one; sources and
/// enrichment still hit the real services.
pub async fn run_job(config: &Config, dry_run: bool) -> RunSummary {
    crate::metrics::ensure_metrics_described();

    let http = match crate::http::build_client() {
        Ok(c) => c,
        Err(e) => {
            let mut summary = RunSummary::start(config.job.job());
            summary.finish(Some(&PipelineError::Startup(format!("http client: {e}"))));
            summary.emit();
            return summary;
        }
    };

    let store = select_store(config, &http, dry_run);
    run_with_store(config, &http, store.as_ref()).await
}

/// `MemoryStore` for dry runs, otherwise the configured Supabase project.
pub fn select_store(config: &Config, http: &Client, dry_run: bool) -> Box<dyn RowStore> {
    if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(PostgrestStore::new(
            http.clone(),
            &config.store.url,
            config.store.key.clone(),
        ))
    }
}

/// Build the real adapters from `config`, run the job against `store`, then
/// emit the report and, when `RUNS_TABLE` is set, persist it to the same store.
pub async fn run_with_store(config: &Config, http: &Client, store: &dyn RowStore) -> RunSummary {
    let job = config.job.job();
    let endpoints = &config.endpoints;
    let mut summary = RunSummary::start(job);
    tracing::info!(
        pipeline = job.as_str(),
        run_id = %summary.run_id,
        store = store.name(),
        "run started"
    );

    let result = match &config.job {
        JobConfig::Email(cfg) => {
            let source = GmailSource::new(http.clone(), &cfg.credentials)
                .with_endpoints(&endpoints.gmail_token_url, &endpoints.gmail_api_base);
            email::run(&source, store, &cfg.settings, &mut summary).await
        }
        JobConfig::News(cfg) => {
            let primary = NewsApiSource::new(
                http.clone(),
                cfg.news_api_key.clone(),
                &cfg.country,
                cfg.sources.categories.clone(),
            )
            .with_base_url(&endpoints.newsapi_base);
            let fallback = (!cfg.sources.rss_feeds.is_empty())
                .then(|| RssSource::new(http.clone(), cfg.sources.rss_feeds.clone()));
            let enricher =
                GeminiEnricher::new(http.clone(), cfg.gemini_api_key.clone(), &cfg.gemini_model)
                    .with_base_url(&endpoints.gemini_base);
            news::run(
                &primary,
                fallback.as_ref().map(|f| f as &dyn NewsSource),
                &enricher,
                store,
                &cfg.settings,
                &mut summary,
            )
            .await
        }
    };

    summary.finish(result.as_ref().err());
    summary.emit();

    if let Some(table) = &config.store.runs_table {
        report::persist(&summary, store, table).await;
    }
    summary
}
