//! Normalizer: raw source records → persisted row shapes.
//!
//! Pure functions only. `processed_at` is passed in so callers (and tests)
//! control the clock.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::ingest::collapse_ws;
use crate::ingest::types::{RawArticle, RawEmail};
use crate::sink::Row;

pub const EMAIL_KEY_COLUMN: &str = "message_id";
pub const NEWS_KEY_COLUMN: &str = "news_key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub message_id: String,
    pub subject: String,
    pub date: String,
    pub body: String,
    pub from_email: String,
    pub pipeline_name: String,
    pub processed_at: DateTime<Utc>,
}

impl EmailRecord {
    pub fn from_raw(raw: RawEmail, pipeline_name: &str, processed_at: DateTime<Utc>) -> Self {
        let from_email = extract_address(&raw.from);
        Self {
            message_id: raw.message_id,
            subject: raw.subject,
            date: raw.date,
            body: raw.body,
            from_email,
            pipeline_name: pipeline_name.to_string(),
            processed_at,
        }
    }

    pub fn to_row(&self) -> Row {
        let mut m = Map::new();
        m.insert(EMAIL_KEY_COLUMN.into(), Value::from(self.message_id.as_str()));
        m.insert("subject".into(), Value::from(self.subject.as_str()));
        m.insert("date".into(), Value::from(self.date.as_str()));
        m.insert("body".into(), Value::from(self.body.as_str()));
        m.insert("from_email".into(), Value::from(self.from_email.as_str()));
        m.insert("pipeline_name".into(), Value::from(self.pipeline_name.as_str()));
        m.insert("processed_at".into(), Value::from(rfc3339(self.processed_at)));
        Row::new(self.message_id.clone(), m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    Ok,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItemRecord {
    pub news_key: String,
    pub headline: String,
    pub source: String,
    pub published_at: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub category: String,
    /// `None` when enrichment failed; the row is still stored.
    pub generated_text: Option<String>,
    pub enrichment_status: EnrichmentStatus,
    pub processed_at: DateTime<Utc>,
}

impl NewsItemRecord {
    pub fn from_article(
        raw: RawArticle,
        generated_text: Option<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        let news_key = news_key(&raw.headline, &raw.source, &raw.published_at);
        let enrichment_status = if generated_text.is_some() {
            EnrichmentStatus::Ok
        } else {
            EnrichmentStatus::Failed
        };
        Self {
            news_key,
            headline: raw.headline,
            source: raw.source,
            published_at: raw.published_at,
            url: raw.url,
            description: raw.description,
            category: raw.category,
            generated_text,
            enrichment_status,
            processed_at,
        }
    }

    pub fn to_row(&self) -> Row {
        let mut m = Map::new();
        m.insert(NEWS_KEY_COLUMN.into(), Value::from(self.news_key.as_str()));
        m.insert("headline".into(), Value::from(self.headline.as_str()));
        m.insert("source".into(), Value::from(self.source.as_str()));
        m.insert("published_at".into(), Value::from(self.published_at.as_str()));
        m.insert("url".into(), opt(&self.url));
        m.insert("description".into(), opt(&self.description));
        m.insert("category".into(), Value::from(self.category.as_str()));
        m.insert("generated_text".into(), opt(&self.generated_text));
        m.insert(
            "enrichment_status".into(),
            Value::from(self.enrichment_status.as_str()),
        );
        m.insert("processed_at".into(), Value::from(rfc3339(self.processed_at)));
        Row::new(self.news_key.clone(), m)
    }
}

/// Natural key of a news item: hex SHA-256 over (headline, source, day).
///
/// The headline is whitespace-collapsed and lowercased so cosmetic edits
/// between fetches map to the same key. The day is the UTC calendar date of
/// `published_at` when it parses as RFC 3339 or RFC 2822; otherwise the
/// trimmed raw string is used.
pub fn news_key(headline: &str, source: &str, published_at: &str) -> String {
    let headline = collapse_ws(headline).to_lowercase();
    let source = collapse_ws(source).to_lowercase();
    let day = publish_day(published_at);

    let mut hasher = Sha256::new();
    hasher.update(headline.as_bytes());
    hasher.update([0x1f]);
    hasher.update(source.as_bytes());
    hasher.update([0x1f]);
    hasher.update(day.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn publish_day(published_at: &str) -> String {
    let t = published_at.trim();
    DateTime::parse_from_rfc3339(t)
        .or_else(|_| DateTime::parse_from_rfc2822(t))
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| t.to_string())
}

/// `"Name <a@b.c>"` → `"a@b.c"`. Only the first bracketed mailbox is used;
/// anything without a closed `<...>` is kept.
pub fn extract_address(from_header: &str) -> String {
    let s = from_header.trim();
    let bracketed = s.find('<').and_then(|open| {
        let rest = &s[open + 1..];
        rest.find('>').map(|close| &rest[..close])
    });
    match bracketed {
        Some(addr) => addr.trim().to_string(),
        None => s.to_string(),
    }
}

fn opt(v: &Option<String>) -> Value {
    v.as_deref().map(Value::from).unwrap_or(Value::Null)
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
