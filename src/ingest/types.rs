// src/ingest/types.rs
use anyhow::Result;

/// A message as returned by the mail source, before normalization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawEmail {
    pub message_id: String,
    pub subject: String,
    pub date: String, // verbatim `Date` header
    pub from: String, // verbatim `From` header
    pub body: String, // may be empty
}

/// A headline as returned by a news source, before enrichment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawArticle {
    pub headline: String,
    pub source: String,       // e.g. "Times of India"
    pub published_at: String, // RFC 3339 when the source date parses, else verbatim
    pub url: Option<String>,
    pub description: Option<String>,
    pub category: String, // e.g. "general", "sports", "rss"
}

#[async_trait::async_trait]
pub trait EmailSource: Send + Sync {
    /// Messages from `sender`, most recent first, at most `cap` of them.
    async fn fetch_from_sender(&self, sender: &str, cap: usize) -> Result<Vec<RawEmail>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Today's top headlines, at most `limit` of them.
    async fn fetch_top(&self, limit: usize) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &'static str;
}
