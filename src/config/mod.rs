//! Process configuration, built once at startup from the environment.
//!
//! Only the variables of the selected job are required; a missing or invalid
//! value is a startup failure raised before any network call.

use secrecy::SecretString;

use crate::enrich::gemini;
use crate::error::ConfigError;
use crate::ingest::providers::{gmail, newsapi};
use crate::ingest::config::{load_news_sources, NewsSources, ENV_PATH, TOP_N};
use crate::pipeline::Job;

pub const DEFAULT_EMAIL_TABLE: &str = "emails";
pub const DEFAULT_NEWS_TABLE: &str = "news_items";
pub const DEFAULT_PIPELINE_NAME: &str = "news_digest_pipeline";
pub const DEFAULT_EMAIL_MAX_RESULTS: usize = 50;
pub const DEFAULT_NEWS_COUNTRY: &str = "in";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Remote table store (Supabase project).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: SecretString,
    /// When set, each run's summary is also written to this table.
    pub runs_table: Option<String>,
}

/// Base URLs of the external services. Defaults are the public APIs; each
/// can be overridden (proxy, local stand-in) through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub gmail_token_url: String,
    pub gmail_api_base: String,
    pub newsapi_base: String,
    pub gemini_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gmail_token_url: gmail::DEFAULT_TOKEN_URL.to_string(),
            gmail_api_base: gmail::DEFAULT_API_BASE.to_string(),
            newsapi_base: newsapi::DEFAULT_BASE_URL.to_string(),
            gemini_base: gemini::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

/// What the email pipeline needs besides credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub sender: String,
    pub table: String,
    pub max_results: usize,
    pub pipeline_name: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub credentials: GmailCredentials,
    pub settings: EmailSettings,
}

/// What the news pipeline needs besides credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSettings {
    pub table: String,
    pub top_n: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            table: DEFAULT_NEWS_TABLE.to_string(),
            top_n: TOP_N,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub news_api_key: SecretString,
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub country: String,
    pub sources: NewsSources,
    pub settings: NewsSettings,
}

#[derive(Debug, Clone)]
pub enum JobConfig {
    Email(EmailConfig),
    News(NewsConfig),
}

impl JobConfig {
    pub fn job(&self) -> Job {
        match self {
            Self::Email(_) => Job::Email,
            Self::News(_) => Job::News,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub endpoints: Endpoints,
    pub job: JobConfig,
}

impl Config {
    /// Read the process environment (after `.env` has been loaded).
    pub fn from_env(job: Job) -> Result<Self, ConfigError> {
        Self::from_lookup(job, |k| std::env::var(k).ok())
    }

    /// Build from any key→value lookup; blank values count as missing.
    pub fn from_lookup<F>(job: Job, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |k: &str| get(k).ok_or_else(|| ConfigError::MissingEnvVar(k.to_string()));

        let url = required("SUPABASE_URL")?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                key: "SUPABASE_URL".into(),
                message: "must be an http(s) URL".into(),
            });
        }
        let store = StoreConfig {
            url,
            key: SecretString::from(required("SUPABASE_KEY")?),
            runs_table: get("RUNS_TABLE"),
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            gmail_token_url: get("GMAIL_TOKEN_URL").unwrap_or(defaults.gmail_token_url),
            gmail_api_base: get("GMAIL_API_BASE").unwrap_or(defaults.gmail_api_base),
            newsapi_base: get("NEWSAPI_BASE_URL").unwrap_or(defaults.newsapi_base),
            gemini_base: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base),
        };

        let job = match job {
            Job::Email => {
                let sender = required("TARGET_EMAIL")?;
                if !sender.contains('@') {
                    return Err(ConfigError::InvalidValue {
                        key: "TARGET_EMAIL".into(),
                        message: format!("`{sender}` is not an email address"),
                    });
                }
                let max_results = match get("EMAIL_MAX_RESULTS") {
                    None => DEFAULT_EMAIL_MAX_RESULTS,
                    Some(raw) => parse_max_results(&raw)?,
                };
                JobConfig::Email(EmailConfig {
                    credentials: GmailCredentials {
                        client_id: required("GMAIL_CLIENT_ID")?,
                        client_secret: SecretString::from(required("GMAIL_CLIENT_SECRET")?),
                        refresh_token: SecretString::from(required("GMAIL_REFRESH_TOKEN")?),
                    },
                    settings: EmailSettings {
                        sender,
                        table: get("EMAIL_TABLE").unwrap_or_else(|| DEFAULT_EMAIL_TABLE.into()),
                        max_results,
                        pipeline_name: get("PIPELINE_NAME")
                            .unwrap_or_else(|| DEFAULT_PIPELINE_NAME.into()),
                    },
                })
            }
            Job::News => {
                let news_api_key = SecretString::from(required("NEWS_API_KEY")?);
                let gemini_api_key = SecretString::from(required("GEMINI_API_KEY")?);
                let sources = load_news_sources(get(ENV_PATH).as_deref())
                    .map_err(|e| ConfigError::Sources(format!("{e:#}")))?;
                JobConfig::News(NewsConfig {
                    news_api_key,
                    gemini_api_key,
                    gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
                    country: get("NEWS_COUNTRY")
                        .map(|c| c.to_ascii_lowercase())
                        .unwrap_or_else(|| DEFAULT_NEWS_COUNTRY.into()),
                    sources,
                    settings: NewsSettings {
                        table: get("NEWS_TABLE").unwrap_or_else(|| DEFAULT_NEWS_TABLE.into()),
                        top_n: TOP_N,
                    },
                })
            }
        };

        Ok(Self {
            store,
            endpoints,
            job,
        })
    }
}

fn parse_max_results(raw: &str) -> Result<usize, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "EMAIL_MAX_RESULTS".into(),
        message,
    };
    let n: usize = raw
        .parse()
        .map_err(|_| invalid(format!("`{raw}` is not a number")))?;
    if !(1..=500).contains(&n) {
        return Err(invalid(format!("{n} is outside 1..=500")));
    }
    Ok(n)
}
