// tests/news_pipeline.rs
mod common;

use common::{article, FailingNews, FlakyEnricher, StaticNews};
use daily_pipelines::config::NewsSettings;
use daily_pipelines::enrich::FixedEnricher;
use daily_pipelines::ingest::types::NewsSource;
use daily_pipelines::pipeline::{news, Job};
use daily_pipelines::report::{RunStatus, RunSummary};
use daily_pipelines::sink::MemoryStore;
use daily_pipelines::PipelineError;
use serde_json::Value;

fn three() -> Vec<daily_pipelines::ingest::types::RawArticle> {
    vec![
        article("India Wins Cricket World Cup Semi-Final Against Australia", "Times of India Sports"),
        article("New Metro Line Opens in Mumbai, Reduces Commute Time by 40%", "Mumbai Mirror"),
        article("India's Space Mission Successfully Lands on Moon's South Pole", "The Hindu Science"),
    ]
}

#[tokio::test]
async fn three_headlines_all_enriched_into_empty_store() {
    let source = StaticNews::new(three());
    let enricher = FlakyEnricher { fail_on: None };
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    let res = news::run(&source, None, &enricher, &store, &NewsSettings::default(), &mut summary).await;
    summary.finish(res.as_ref().err());

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.enriched_ok, 3);
    assert_eq!(summary.enriched_failed, 0);
    assert_eq!(summary.stored, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.status, RunStatus::Success);

    let rows = store.rows("news_items");
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["enrichment_status"] == "ok"));
    assert!(rows
        .iter()
        .all(|r| r["generated_text"].as_str().is_some_and(|t| t.starts_with("Caption: "))));
}

#[tokio::test]
async fn one_enrichment_failure_still_stores_every_item() {
    let items = three();
    let failing = items[1].headline.clone();
    let source = StaticNews::new(items);
    let enricher = FlakyEnricher { fail_on: Some(failing.clone()) };
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    let res = news::run(&source, None, &enricher, &store, &NewsSettings::default(), &mut summary).await;
    summary.finish(res.as_ref().err());

    assert!(summary.is_success());
    assert_eq!(summary.enriched_ok, 2);
    assert_eq!(summary.enriched_failed, 1);
    assert_eq!(summary.stored, 3);

    let rows = store.rows("news_items");
    let with_text = rows.iter().filter(|r| r["generated_text"] != Value::Null).count();
    assert_eq!(with_text, 2);
    let failed: Vec<_> = rows
        .iter()
        .filter(|r| r["enrichment_status"] == "failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["headline"], failing.as_str());
}

#[tokio::test]
async fn rerun_on_same_headlines_skips_all() {
    let source = StaticNews::new(three());
    let enricher = FixedEnricher::new("Today:");
    let store = MemoryStore::new();
    let settings = NewsSettings::default();

    let mut first = RunSummary::start(Job::News);
    news::run(&source, None, &enricher, &store, &settings, &mut first).await.unwrap();
    let mut second = RunSummary::start(Job::News);
    news::run(&source, None, &enricher, &store, &settings, &mut second).await.unwrap();

    assert_eq!((second.stored, second.skipped), (0, 3));
    assert_eq!(store.len("news_items"), 3);
}

#[tokio::test]
async fn more_than_top_n_is_truncated() {
    let mut items = three();
    items.push(article("Fourth headline", "Extra"));
    items.push(article("Fifth headline", "Extra"));
    let source = StaticNews::new(items);
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    news::run(&source, None, &FixedEnricher::new("x"), &store, &NewsSettings::default(), &mut summary)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(store.len("news_items"), 3);
}

#[tokio::test]
async fn empty_primary_falls_back_to_rss() {
    let primary = StaticNews::new(vec![]);
    let mut rss_item = article("Monsoon arrives early", "NDTV");
    rss_item.category = "rss".into();
    let fallback = StaticNews::new(vec![rss_item]);
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    news::run(
        &primary,
        Some(&fallback as &dyn NewsSource),
        &FixedEnricher::new("x"),
        &store,
        &NewsSettings::default(),
        &mut summary,
    )
    .await
    .unwrap();

    assert_eq!(fallback.calls(), 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(store.rows("news_items")[0]["category"], "rss");
}

#[tokio::test]
async fn primary_error_is_fatal_and_skips_fallback() {
    let fallback = StaticNews::new(three());
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    let res = news::run(
        &FailingNews,
        Some(&fallback as &dyn NewsSource),
        &FixedEnricher::new("x"),
        &store,
        &NewsSettings::default(),
        &mut summary,
    )
    .await;
    summary.finish(res.as_ref().err());

    assert!(matches!(res, Err(PipelineError::Fetch { .. })));
    assert_eq!(fallback.calls(), 0);
    assert!(store.is_empty());
    assert_eq!(summary.status, RunStatus::Failure);
}

#[tokio::test]
async fn empty_headline_counts_as_enrichment_failure() {
    let mut items = three();
    items[0].headline = "   ".into();
    let source = StaticNews::new(items);
    let store = MemoryStore::new();
    let mut summary = RunSummary::start(Job::News);

    news::run(&source, None, &FixedEnricher::new("x"), &store, &NewsSettings::default(), &mut summary)
        .await
        .unwrap();

    assert_eq!(summary.enriched_failed, 1);
    assert_eq!(summary.enriched_ok, 2);
    assert_eq!(summary.stored, 3);
}
