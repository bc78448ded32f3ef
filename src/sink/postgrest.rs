//! Supabase PostgREST adapter.
//!
//! Uses `on_conflict=<key>` with `resolution=ignore-duplicates` so the database
//! unique constraint does the dedup; `return=representation` tells us whether
//! the row was actually written (one element) or ignored (empty array).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::{InsertOutcome, Row, RowStore, StoreError};

const PREFER: &str = "resolution=ignore-duplicates,return=representation";

pub struct PostgrestStore {
    http: Client,
    base_url: String,
    key: SecretString,
}

impl PostgrestStore {
    /// `base_url` is the project URL (e.g. `https://xyz.supabase.co`).
    pub fn new(http: Client, base_url: &str, key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl RowStore for PostgrestStore {
    async fn insert_if_absent(
        &self,
        table: &str,
        key_column: &str,
        row: &Row,
    ) -> Result<InsertOutcome, StoreError> {
        let key = self.key.expose_secret();
        let resp = self
            .http
            .post(self.table_url(table))
            .query(&[("on_conflict", key_column)])
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", PREFER)
            .json(&row.columns)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::Auth {
                    status: status.as_u16(),
                })
            }
            // unique violation without on_conflict support (e.g. older PostgREST)
            StatusCode::CONFLICT => return Ok(InsertOutcome::AlreadyPresent),
            s if !s.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                return Err(StoreError::Rejected {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        outcome_from_body(&text)
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}

/// Interpret a 2xx `return=representation` body.
fn outcome_from_body(text: &str) -> Result<InsertOutcome, StoreError> {
    if text.trim().is_empty() {
        // 201 without representation: the row went in
        return Ok(InsertOutcome::Inserted);
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) if items.is_empty() => Ok(InsertOutcome::AlreadyPresent),
        Ok(Value::Array(_)) | Ok(Value::Object(_)) => Ok(InsertOutcome::Inserted),
        Ok(other) => Err(StoreError::InvalidResponse(format!(
            "unexpected body: {other}"
        ))),
        Err(e) => Err(StoreError::InvalidResponse(e.to_string())),
    }
}
