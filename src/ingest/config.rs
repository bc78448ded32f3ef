// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATH: &str = "NEWS_SOURCES_PATH";

/// Number of headlines processed per news run.
pub const TOP_N: usize = 3;

/// One NewsAPI category and how many of its headlines to take.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategorySlot {
    pub name: String,
    pub count: usize,
}

/// Which NewsAPI categories to pull and which RSS feeds to fall back on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewsSources {
    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySlot>,
    #[serde(default)]
    pub rss_feeds: Vec<String>,
}

impl Default for NewsSources {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            rss_feeds: vec![
                "https://feeds.feedburner.com/ndtvnews-top-stories".to_string(),
                "https://timesofindia.indiatimes.com/rssfeedstopstories.cms".to_string(),
                "https://www.thehindu.com/news/national/feeder/default.rss".to_string(),
            ],
        }
    }
}

fn default_categories() -> Vec<CategorySlot> {
    vec![
        CategorySlot {
            name: "general".into(),
            count: 2,
        },
        CategorySlot {
            name: "sports".into(),
            count: 1,
        },
    ]
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_news_sources_from(path: &Path) -> Result<NewsSources> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading news sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_news_sources(&content, ext.as_str())
}

/// Resolve sources:
/// 1) `explicit` (the value of $NEWS_SOURCES_PATH, if set)
/// 2) config/news_sources.toml
/// 3) config/news_sources.json
/// 4) built-in defaults
pub fn load_news_sources(explicit: Option<&str>) -> Result<NewsSources> {
    if let Some(p) = explicit {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_news_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/news_sources.toml");
    if toml_p.exists() {
        return load_news_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/news_sources.json");
    if json_p.exists() {
        return load_news_sources_from(&json_p);
    }
    Ok(NewsSources::default())
}

fn parse_news_sources(s: &str, hint_ext: &str) -> Result<NewsSources> {
    let parsed = if hint_ext == "json" {
        serde_json::from_str::<NewsSources>(s).context("parsing news sources json")?
    } else {
        toml::from_str::<NewsSources>(s).context("parsing news sources toml")?
    };
    Ok(clean(parsed))
}

/// Trim names/urls, drop empty entries and zero counts, and cap the plan so
/// it never asks for more than `TOP_N` headlines in total.
fn clean(src: NewsSources) -> NewsSources {
    let mut budget = TOP_N;
    let mut categories = Vec::new();
    for slot in src.categories {
        let name = slot.name.trim().to_ascii_lowercase();
        if name.is_empty() || slot.count == 0 || budget == 0 {
            continue;
        }
        let count = slot.count.min(budget);
        budget -= count;
        categories.push(CategorySlot { name, count });
    }

    let mut rss_feeds: Vec<String> = Vec::new();
    for f in src.rss_feeds {
        let t = f.trim();
        if !t.is_empty() && !rss_feeds.iter().any(|x| x == t) {
            rss_feeds.push(t.to_string());
        }
    }

    NewsSources {
        categories,
        rss_feeds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_is_capped_to_top_n() {
        let toml = r#"
categories = [
  { name = " General ", count = 2 },
  { name = "sports", count = 5 },
  { name = "business", count = 1 },
]
"#;
        let out = parse_news_sources(toml, "toml").unwrap();
        assert_eq!(
            out.categories,
            vec![
                CategorySlot { name: "general".into(), count: 2 },
                CategorySlot { name: "sports".into(), count: 1 },
            ]
        );
        // feeds absent in file -> empty, not the defaults
        assert!(out.rss_feeds.is_empty());
    }

    #[test]
    fn json_feeds_are_trimmed_and_deduped() {
        let json = r#"{"rss_feeds": [" https://a/rss ", "", "https://a/rss", "https://b/rss"]}"#;
        let out = parse_news_sources(json, "json").unwrap();
        assert_eq!(out.rss_feeds, vec!["https://a/rss", "https://b/rss"]);
        assert_eq!(out.categories, default_categories());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_news_sources(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains(ENV_PATH));
    }
}
