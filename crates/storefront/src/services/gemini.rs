//! Generative-AI product keyword extraction for image search.
//!
//! Sends an uploaded image to the Gemini `generateContent` REST endpoint
//! with a fixed prompt and turns the reply into a single search keyword.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GeminiConfig;

/// Instruction sent alongside every image.
pub const KEYWORD_PROMPT: &str = "You are an expert product identifier for an e-commerce site. \
Analyze the image and return ONLY the most relevant product keyword (e.g., \"shoes\", \
\"headphones\", \"t-shirt\"). Do not return sentences, descriptions, or extra text. \
Output just the keyword.";

/// MIME type assumed when the upload does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Errors that can occur when calling Gemini.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default()
    }
}

/// Gemini REST client.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                endpoint: format!(
                    "{}/v1beta/models/{}:generateContent",
                    config.api_base.trim_end_matches('/'),
                    config.model
                ),
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Identify the product in an image and return one keyword.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the reply cannot be decoded.
    #[instrument(skip(self, image), fields(bytes = image.len(), mime_type = %mime_type))]
    pub async fn extract_keyword(&self, image: &[u8], mime_type: &str) -> Result<String, GeminiError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": KEYWORD_PROMPT },
                    { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(image) } }
                ]
            }]
        });

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("x-goog-api-key", self.inner.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        let raw = reply.first_text();
        debug!(raw = %raw, "Gemini reply");
        Ok(parse_keyword(&raw))
    }
}

/// Reduce a model reply to a keyword.
///
/// A JSON object reply yields its `keyword`, else its `name`; anything else
/// is used as-is after trimming.
#[must_use]
pub fn parse_keyword(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let field = ["keyword", "name"].into_iter().find_map(|key| {
            map.get(key)
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
        });
        if let Some(keyword) = field {
            return keyword.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keyword_trimmed() {
        assert_eq!(parse_keyword("  headphones\n"), "headphones");
    }

    #[test]
    fn test_json_keyword_preferred_over_name() {
        assert_eq!(parse_keyword(r#"{"keyword":"shoes","name":"Sneaker"}"#), "shoes");
        assert_eq!(parse_keyword(r#"{"name":"t-shirt"}"#), "t-shirt");
    }

    #[test]
    fn test_json_without_known_fields_kept_raw() {
        assert_eq!(parse_keyword(r#"{"label":"bag"}"#), r#"{"label":"bag"}"#);
        assert_eq!(parse_keyword("\"shoes\""), "\"shoes\"");
    }

    #[test]
    fn test_first_text_of_response() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"watch"}],"role":"model"}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), "watch");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), "");
    }
}
