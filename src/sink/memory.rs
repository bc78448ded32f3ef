// src/sink/memory.rs
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{InsertOutcome, Row, RowStore, StoreError};

/// In-process store keyed by `(table, natural key)`. Backs `--dry-run` and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(String, String), Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored in `table`.
    pub fn len(&self, table: &str) -> usize {
        let g = self.rows.lock().expect("memory store mutex poisoned");
        g.keys().filter(|(t, _)| t == table).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows
            .lock()
            .expect("memory store mutex poisoned")
            .is_empty()
    }

    /// Rows of `table` in key order.
    pub fn rows(&self, table: &str) -> Vec<Map<String, Value>> {
        let g = self.rows.lock().expect("memory store mutex poisoned");
        g.iter()
            .filter(|((t, _), _)| t == table)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Pre-seed a row, e.g. one written by an earlier run.
    pub fn seed(&self, table: &str, row: &Row) {
        let mut g = self.rows.lock().expect("memory store mutex poisoned");
        g.insert((table.to_string(), row.key.clone()), row.columns.clone());
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        table: &str,
        _key_column: &str,
        row: &Row,
    ) -> Result<InsertOutcome, StoreError> {
        let mut g = self.rows.lock().expect("memory store mutex poisoned");
        let k = (table.to_string(), row.key.clone());
        if g.contains_key(&k) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        g.insert(k, row.columns.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn second_insert_is_a_noop() {
        let store = MemoryStore::new();
        let mut cols = Map::new();
        cols.insert("message_id".into(), json!("m1"));
        cols.insert("subject".into(), json!("first"));
        let first = Row::new("m1", cols.clone());
        cols.insert("subject".into(), json!("second"));
        let second = Row::new("m1", cols);

        let a = store.insert_if_absent("emails", "message_id", &first).await.unwrap();
        let b = store.insert_if_absent("emails", "message_id", &second).await.unwrap();
        assert_eq!(a, InsertOutcome::Inserted);
        assert_eq!(b, InsertOutcome::AlreadyPresent);

        // never updated
        let rows = store.rows("emails");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["subject"], json!("first"));
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = MemoryStore::new();
        let r = Row::new("k", Map::new());
        store.insert_if_absent("a", "id", &r).await.unwrap();
        let out = store.insert_if_absent("b", "id", &r).await.unwrap();
        assert_eq!(out, InsertOutcome::Inserted);
        assert_eq!(store.len("a"), 1);
        assert_eq!(store.len("b"), 1);
    }
}
