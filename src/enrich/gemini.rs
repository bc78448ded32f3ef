use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{build_prompt, sanitize_caption, EnrichError, Enricher};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// Gemini `generateContent` (single request/response, no streaming).
pub struct GeminiEnricher {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiEnricher {
    pub fn new(http: Client, api_key: SecretString, model: &str) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}
#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}
#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Enricher for GeminiEnricher {
    async fn caption(
        &self,
        headline: &str,
        description: Option<&str>,
    ) -> Result<String, EnrichError> {
        if headline.trim().is_empty() {
            return Err(EnrichError::EmptyHeadline);
        }

        let prompt = build_prompt(headline, description);
        let req = Req {
            contents: vec![Content {
                parts: vec![PartOut { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 120,
            },
        };

        let resp = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&req)
            .send()
            .await
            .map_err(|e| EnrichError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Resp = resp.json().await.map_err(|e| EnrichError::RequestFailed {
            provider: PROVIDER.into(),
            reason: format!("decoding response: {e}"),
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        let caption = sanitize_caption(&text);
        if caption.is_empty() {
            return Err(EnrichError::EmptyOutput {
                provider: PROVIDER.into(),
            });
        }
        Ok(caption)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
