//! Ingestion sink: insert-if-absent writes keyed by a natural key.
//!
//! The store decides whether a key already exists; this module only walks the
//! batch in order, drops keys repeated inside the batch, and tallies the
//! outcome. The first store failure aborts the rest of the batch.

pub mod memory;
pub mod postgrest;

use std::collections::HashSet;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// One normalized row: the natural key plus the column values to write.
/// `columns` must also contain the key under the table's key column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub columns: Map<String, Value>,
}

impl Row {
    pub fn new(key: impl Into<String>, columns: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            columns,
        }
    }
}

/// Result of a single insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("store rejected row (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

/// A row-oriented remote table store with insert-if-absent semantics.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert `row` unless a row with the same `key_column` value exists.
    /// Never updates an existing row.
    async fn insert_if_absent(
        &self,
        table: &str,
        key_column: &str,
        row: &Row,
    ) -> Result<InsertOutcome, StoreError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub stored: usize,
    pub skipped: usize,
}

/// The batch stopped at a store failure; `stats` covers the rows before it.
#[derive(Debug, thiserror::Error)]
#[error(
    "write to `{table}` aborted after {stored} stored and {skipped} skipped: {error}",
    stored = .stats.stored,
    skipped = .stats.skipped
)]
pub struct SinkAborted {
    pub table: String,
    pub stats: IngestStats,
    #[source]
    pub error: StoreError,
}

/// Write `rows` in order. Re-running the same batch stores nothing new and
/// reports every row as skipped.
pub async fn ingest_batch(
    store: &dyn RowStore,
    table: &str,
    key_column: &str,
    rows: &[Row],
) -> Result<IngestStats, SinkAborted> {
    let mut stats = IngestStats::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());

    for row in rows {
        if !seen.insert(row.key.as_str()) {
            tracing::debug!(target: "sink", table, key = %row.key, "duplicate key within batch");
            stats.skipped += 1;
            counter!("sink_skipped_total").increment(1);
            continue;
        }

        match store.insert_if_absent(table, key_column, row).await {
            Ok(InsertOutcome::Inserted) => {
                stats.stored += 1;
                counter!("sink_stored_total").increment(1);
            }
            Ok(InsertOutcome::AlreadyPresent) => {
                tracing::debug!(target: "sink", table, key = %row.key, "already stored");
                stats.skipped += 1;
                counter!("sink_skipped_total").increment(1);
            }
            Err(error) => {
                tracing::error!(
                    target: "sink",
                    table,
                    store = store.name(),
                    key = %row.key,
                    error = %error,
                    "store write failed; aborting batch"
                );
                return Err(SinkAborted {
                    table: table.to_string(),
                    stats,
                    error,
                });
            }
        }
    }

    tracing::info!(
        target: "sink",
        table,
        stored = stats.stored,
        skipped = stats.skipped,
        "batch written"
    );
    Ok(stats)
}
