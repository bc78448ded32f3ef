// tests/common/mod.rs
// Shared fakes for pipeline tests and a tiny local HTTP server for adapter tests.
#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use daily_pipelines::enrich::{sanitize_caption, EnrichError, Enricher};
use daily_pipelines::ingest::types::{EmailSource, NewsSource, RawArticle, RawEmail};
use daily_pipelines::sink::{InsertOutcome, MemoryStore, Row, RowStore, StoreError};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

pub fn http() -> reqwest::Client {
    daily_pipelines::http::build_client().expect("http client")
}

pub fn email(id: &str, subject: &str) -> RawEmail {
    RawEmail {
        message_id: id.to_string(),
        subject: subject.to_string(),
        date: "Mon, 15 Jan 2024 10:30:00 +0000".to_string(),
        from: "Digest <digest@example.com>".to_string(),
        body: format!("body of {id}"),
    }
}

pub fn article(headline: &str, source: &str) -> RawArticle {
    RawArticle {
        headline: headline.to_string(),
        source: source.to_string(),
        published_at: "2024-01-15T10:30:00Z".to_string(),
        url: Some(format!("https://example.com/{}", headline.len())),
        description: None,
        category: "general".to_string(),
    }
}

/// Returns its messages regardless of the cap it is given.
pub struct StaticEmails(pub Vec<RawEmail>);

#[async_trait]
impl EmailSource for StaticEmails {
    async fn fetch_from_sender(&self, _sender: &str, _cap: usize) -> Result<Vec<RawEmail>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "static-emails"
    }
}

pub struct FailingEmails;

#[async_trait]
impl EmailSource for FailingEmails {
    async fn fetch_from_sender(&self, _sender: &str, _cap: usize) -> Result<Vec<RawEmail>> {
        Err(anyhow!("token exchange rejected: 401 Unauthorized"))
    }
    fn name(&self) -> &'static str {
        "failing-emails"
    }
}

pub struct StaticNews {
    pub items: Vec<RawArticle>,
    pub calls: Mutex<usize>,
}

impl StaticNews {
    pub fn new(items: Vec<RawArticle>) -> Self {
        Self {
            items,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl NewsSource for StaticNews {
    async fn fetch_top(&self, _limit: usize) -> Result<Vec<RawArticle>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        "static-news"
    }
}

pub struct FailingNews;

#[async_trait]
impl NewsSource for FailingNews {
    async fn fetch_top(&self, _limit: usize) -> Result<Vec<RawArticle>> {
        Err(anyhow!("newsapi error (HTTP 401): Your API key is invalid"))
    }
    fn name(&self) -> &'static str {
        "failing-news"
    }
}

/// Captions every headline except `fail_on`.
pub struct FlakyEnricher {
    pub fail_on: Option<String>,
}

#[async_trait]
impl Enricher for FlakyEnricher {
    async fn caption(
        &self,
        headline: &str,
        _description: Option<&str>,
    ) -> Result<String, EnrichError> {
        if self.fail_on.as_deref() == Some(headline) {
            return Err(EnrichError::Status {
                provider: "flaky".into(),
                status: 429,
                body: "quota".into(),
            });
        }
        Ok(sanitize_caption(&format!("Caption: {headline}")))
    }
    fn provider_name(&self) -> &'static str {
        "flaky"
    }
}

/// Accepts `ok_writes` store calls, then reports the store as unreachable.
pub struct FailAfterStore {
    pub inner: MemoryStore,
    pub ok_writes: usize,
    pub attempts: Mutex<usize>,
}

impl FailAfterStore {
    pub fn new(ok_writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            ok_writes,
            attempts: Mutex::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl RowStore for FailAfterStore {
    async fn insert_if_absent(
        &self,
        table: &str,
        key_column: &str,
        row: &Row,
    ) -> Result<InsertOutcome, StoreError> {
        let n = {
            let mut g = self.attempts.lock().unwrap();
            *g += 1;
            *g
        };
        if n > self.ok_writes {
            return Err(StoreError::Unreachable("connection reset".into()));
        }
        self.inner.insert_if_absent(table, key_column, row).await
    }
    fn name(&self) -> &'static str {
        "fail-after"
    }
}
