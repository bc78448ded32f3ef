// src/ingest/providers/newsapi.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ingest::config::CategorySlot;
use crate::ingest::normalize_text;
use crate::ingest::types::{NewsSource, RawArticle};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

#[derive(Debug, Deserialize)]
struct Resp {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI `top-headlines`, one request per category slot.
pub struct NewsApiSource {
    http: Client,
    base_url: String,
    api_key: SecretString,
    country: String,
    plan: Vec<CategorySlot>,
}

impl NewsApiSource {
    pub fn new(http: Client, api_key: SecretString, country: &str, plan: Vec<CategorySlot>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            country: country.to_string(),
            plan,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_category(&self, slot: &CategorySlot) -> Result<Vec<RawArticle>> {
        let page_size = slot.count.to_string();
        let resp = self
            .http
            .get(format!("{}/top-headlines", self.base_url))
            .header("X-Api-Key", self.api_key.expose_secret())
            .query(&[
                ("country", self.country.as_str()),
                ("category", slot.name.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("newsapi get {}", slot.name))?;

        let http_status = resp.status();
        // NewsAPI returns a JSON error envelope on 4xx too
        let body: Resp = resp
            .json()
            .await
            .with_context(|| format!("newsapi {} response (HTTP {http_status})", slot.name))?;
        if !http_status.is_success() || body.status != "ok" {
            return Err(anyhow!(
                "newsapi error (HTTP {}): {}",
                http_status.as_u16(),
                body.message.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        let mut out = Vec::with_capacity(slot.count);
        for a in body.articles {
            let headline = normalize_text(a.title.as_deref().unwrap_or_default());
            // NewsAPI blanks out takedowns as "[Removed]"
            if headline.is_empty() || headline == "[Removed]" {
                continue;
            }
            out.push(RawArticle {
                headline,
                source: a
                    .source
                    .and_then(|s| s.name)
                    .map(|n| normalize_text(&n))
                    .unwrap_or_default(),
                published_at: a.published_at.unwrap_or_default(),
                url: a.url,
                description: a
                    .description
                    .map(|d| normalize_text(&d))
                    .filter(|d| !d.is_empty()),
                category: slot.name.clone(),
            });
            if out.len() >= slot.count {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    async fn fetch_top(&self, limit: usize) -> Result<Vec<RawArticle>> {
        let mut out = Vec::new();
        for slot in &self.plan {
            if out.len() >= limit {
                break;
            }
            let mut items = self.fetch_category(slot).await?;
            tracing::info!(
                target: "ingest",
                provider = "newsapi",
                category = %slot.name,
                count = items.len(),
                "headlines fetched"
            );
            out.append(&mut items);
        }
        out.truncate(limit);
        counter!("pipeline_fetched_total", "pipeline" => "news").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
