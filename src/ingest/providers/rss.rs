use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, format_description::well_known::Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::normalize_text;
use crate::ingest::types::{NewsSource, RawArticle};

/// Items taken from each feed before moving to the next one.
pub const PER_FEED: usize = 2;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 `pubDate` → RFC 3339 UTC; unparseable dates are kept verbatim.
fn rfc2822_to_rfc3339(ts: &str) -> String {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| dt.to_offset(UtcOffset::UTC).format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.trim().to_string())
}

/// Fallback source: a list of RSS 2.0 feeds read in order.
pub struct RssSource {
    http: Client,
    feeds: Vec<String>,
}

impl RssSource {
    pub fn new(http: Client, feeds: Vec<String>) -> Self {
        Self { http, feeds }
    }

    /// Parse one feed document. `feed_url` names the source when the channel
    /// has no title.
    pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<RawArticle>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let source = rss
            .channel
            .title
            .as_deref()
            .map(normalize_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| feed_url.to_string());

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let headline = normalize_text(it.title.as_deref().unwrap_or_default());
            if headline.is_empty() {
                continue;
            }
            out.push(RawArticle {
                headline,
                source: source.clone(),
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(rfc2822_to_rfc3339)
                    .unwrap_or_default(),
                url: it.link.map(|l| l.trim().to_string()),
                description: it
                    .description
                    .as_deref()
                    .map(normalize_text)
                    .filter(|d| !d.is_empty()),
                category: "rss".to_string(),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawArticle>> {
        let body = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("rss get {url}"))?
            .error_for_status()
            .with_context(|| format!("rss get {url} rejected"))?
            .text()
            .await
            .with_context(|| format!("rss body {url}"))?;
        Self::parse_feed(&body, url)
    }
}

#[async_trait]
impl NewsSource for RssSource {
    async fn fetch_top(&self, limit: usize) -> Result<Vec<RawArticle>> {
        let mut out = Vec::new();
        for url in &self.feeds {
            if out.len() >= limit {
                break;
            }
            match self.fetch_feed(url).await {
                Ok(items) => {
                    let room = limit - out.len();
                    out.extend(items.into_iter().take(PER_FEED.min(room)));
                }
                Err(e) => {
                    // one dead feed must not sink the fallback
                    tracing::warn!(target: "ingest", error = ?e, feed = %url, "rss feed error");
                    counter!("ingest_provider_errors_total", "provider" => "rss").increment(1);
                }
            }
        }
        counter!("pipeline_fetched_total", "pipeline" => "news").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
