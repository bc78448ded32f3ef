//! Gmail REST v1 source: refresh-token exchange, sender search, full fetch.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use metrics::counter;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::GmailCredentials;
use crate::ingest::types::{EmailSource, RawEmail};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Gmail emits base64url, usually padded; accept both.
const GMAIL_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListResp {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Subset of the `users.messages` resource used here.
#[derive(Debug, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

pub struct GmailSource {
    http: Client,
    token_url: String,
    api_base: String,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
}

impl GmailSource {
    pub fn new(http: Client, creds: &GmailCredentials) -> Self {
        Self {
            http,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            refresh_token: creds.refresh_token.clone(),
        }
    }

    /// Point the source at another OAuth/API host (tests, proxies).
    pub fn with_endpoints(mut self, token_url: &str, api_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> Result<SecretString> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", self.refresh_token.expose_secret()),
        ];
        let resp: TokenResp = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("gmail token exchange")?
            .error_for_status()
            .context("gmail token exchange rejected")?
            .json()
            .await
            .context("gmail token response")?;
        Ok(SecretString::from(resp.access_token))
    }

    async fn list_ids(&self, token: &SecretString, sender: &str, cap: usize) -> Result<Vec<String>> {
        let query = format!("from:{sender}");
        let max = cap.to_string();
        let list: ListResp = self
            .http
            .get(format!("{}/users/me/messages", self.api_base))
            .bearer_auth(token.expose_secret())
            .query(&[("q", query.as_str()), ("maxResults", max.as_str())])
            .send()
            .await
            .context("gmail list messages")?
            .error_for_status()
            .context("gmail list messages rejected")?
            .json()
            .await
            .context("gmail list response")?;
        Ok(list.messages.into_iter().map(|m| m.id).take(cap).collect())
    }

    async fn get_message(&self, token: &SecretString, id: &str) -> Result<GmailMessage> {
        self.http
            .get(format!("{}/users/me/messages/{}", self.api_base, id))
            .bearer_auth(token.expose_secret())
            .query(&[("format", "full")])
            .send()
            .await
            .with_context(|| format!("gmail get message {id}"))?
            .error_for_status()
            .with_context(|| format!("gmail get message {id} rejected"))?
            .json()
            .await
            .with_context(|| format!("gmail message {id} response"))
    }
}

#[async_trait]
impl EmailSource for GmailSource {
    async fn fetch_from_sender(&self, sender: &str, cap: usize) -> Result<Vec<RawEmail>> {
        if sender.trim().is_empty() {
            return Err(anyhow!("empty sender address"));
        }
        let token = self.access_token().await?;
        let ids = self.list_ids(&token, sender, cap).await?;
        tracing::info!(target: "ingest", provider = "gmail", listed = ids.len(), "messages listed");

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let msg = self.get_message(&token, &id).await?;
            out.push(parse_message(msg));
        }
        counter!("pipeline_fetched_total", "pipeline" => "email").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "gmail"
    }
}

/// Map a full Gmail message to a `RawEmail`. Missing headers become "".
pub fn parse_message(msg: GmailMessage) -> RawEmail {
    let payload = msg.payload.unwrap_or_default();
    let subject = header(&payload, "Subject");
    let date = header(&payload, "Date");
    let from = header(&payload, "From");
    let body = extract_body(&payload);
    RawEmail {
        message_id: msg.id,
        subject,
        date,
        from,
        body,
    }
}

fn header(part: &MessagePart, name: &str) -> String {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

/// First `text/plain` part (depth-first) for multipart mail, else the
/// top-level body, else empty.
pub fn extract_body(payload: &MessagePart) -> String {
    if !payload.parts.is_empty() {
        return find_plain_text(&payload.parts).unwrap_or_default();
    }
    payload
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .map(decode_body)
        .unwrap_or_default()
}

fn find_plain_text(parts: &[MessagePart]) -> Option<String> {
    for p in parts {
        let is_plain = p
            .mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("text/plain"));
        if is_plain {
            if let Some(data) = p.body.as_ref().and_then(|b| b.data.as_deref()) {
                return Some(decode_body(data));
            }
        }
        if let Some(found) = find_plain_text(&p.parts) {
            return Some(found);
        }
    }
    None
}

/// Decode base64url body data to UTF-8 (lossy). Undecodable data yields "".
pub fn decode_body(data: &str) -> String {
    match GMAIL_B64.decode(data.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, "undecodable gmail body");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        base64::engine::general_purpose::URL_SAFE.encode(s)
    }

    fn msg(json: serde_json::Value) -> GmailMessage {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn simple_message_uses_top_level_body() {
        let m = msg(serde_json::json!({
            "id": "m1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "Subject", "value": "Hello"},
                    {"name": "date", "value": "Mon, 15 Jan 2024 10:30:00 +0000"},
                    {"name": "From", "value": "News <news@example.com>"}
                ],
                "body": {"data": b64("plain body")}
            }
        }));
        let raw = parse_message(m);
        assert_eq!(raw.message_id, "m1");
        assert_eq!(raw.subject, "Hello");
        assert_eq!(raw.date, "Mon, 15 Jan 2024 10:30:00 +0000");
        assert_eq!(raw.from, "News <news@example.com>");
        assert_eq!(raw.body, "plain body");
    }

    #[test]
    fn nested_multipart_finds_plain_text() {
        let m = msg(serde_json::json!({
            "id": "m2",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [],
                "parts": [
                    {"mimeType": "multipart/alternative", "parts": [
                        {"mimeType": "text/html", "body": {"data": b64("<p>html</p>")}},
                        {"mimeType": "text/plain", "body": {"data": b64("the text")}}
                    ]},
                    {"mimeType": "application/pdf", "body": {}}
                ]
            }
        }));
        let raw = parse_message(m);
        assert_eq!(raw.body, "the text");
        assert_eq!(raw.subject, "");
    }

    #[test]
    fn multipart_without_plain_text_is_empty() {
        let m = msg(serde_json::json!({
            "id": "m3",
            "payload": {
                "parts": [{"mimeType": "text/html", "body": {"data": b64("<b>x</b>")}}]
            }
        }));
        assert_eq!(parse_message(m).body, "");
    }

    #[test]
    fn unpadded_and_padded_both_decode() {
        assert_eq!(decode_body("aGk"), "hi");
        assert_eq!(decode_body("aGk="), "hi");
        assert_eq!(decode_body("***"), "");
    }
}
