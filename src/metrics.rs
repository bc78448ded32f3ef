use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration so every series carries a description.
/// The binary installs no exporter; an embedding process may install one.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_fetched_total",
            "Raw records returned by source fetchers."
        );
        describe_counter!("sink_stored_total", "Rows newly inserted by the sink.");
        describe_counter!(
            "sink_skipped_total",
            "Rows skipped because their natural key already existed."
        );
        describe_counter!(
            "enrich_failed_total",
            "News items stored without generated text."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Fallback feed fetch/parse errors."
        );
        describe_counter!("pipeline_runs_total", "Completed runs by pipeline and status.");
        describe_histogram!("ingest_parse_ms", "RSS parse time in milliseconds.");
    });
}
