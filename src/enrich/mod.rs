//! Enricher: one short social-post caption per headline.
//!
//! A failure here never aborts a run. The pipeline stores the item without
//! `generated_text` and counts it as enrichment-failed.

pub mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiEnricher;

/// Hard cap on caption length (a tweet).
pub const MAX_CAPTION_CHARS: usize = 280;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("headline is empty")]
    EmptyHeadline,

    #[error("{provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned no usable text")]
    EmptyOutput { provider: String },
}

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Generate a caption for `headline`. `description` adds context when known.
    async fn caption(&self, headline: &str, description: Option<&str>)
        -> Result<String, EnrichError>;

    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Prompt sent to the generative-text service for one headline.
pub fn build_prompt(headline: &str, description: Option<&str>) -> String {
    let mut prompt = String::from(
        "Write one informational yet funny tweet (max 280 characters) about this news item.\n\
         Capture the key point, add light humor without being insensitive, \
         and use an emoji or two if suitable.\n\n",
    );
    prompt.push_str("Headline: ");
    prompt.push_str(headline.trim());
    if let Some(d) = description.map(str::trim).filter(|d| !d.is_empty()) {
        prompt.push_str("\nDetails: ");
        prompt.push_str(d);
    }
    prompt.push_str("\n\nReply with the tweet text only.");
    prompt
}

/// Single line, collapsed whitespace, surrounding quotes removed, and at most
/// `MAX_CAPTION_CHARS` chars (cut to 277 + "...").
pub fn sanitize_caption(input: &str) -> String {
    let one_line = crate::ingest::collapse_ws(input);
    let trimmed = one_line
        .trim_matches(|c| c == '"' || c == '\u{201C}' || c == '\u{201D}')
        .trim();

    if trimmed.chars().count() <= MAX_CAPTION_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_CAPTION_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Deterministic enricher: `"{prefix} {headline}"`, sanitized.
#[derive(Debug, Clone)]
pub struct FixedEnricher {
    pub prefix: String,
}

impl FixedEnricher {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl Enricher for FixedEnricher {
    async fn caption(
        &self,
        headline: &str,
        _description: Option<&str>,
    ) -> Result<String, EnrichError> {
        if headline.trim().is_empty() {
            return Err(EnrichError::EmptyHeadline);
        }
        Ok(sanitize_caption(&format!("{} {}", self.prefix, headline)))
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}
