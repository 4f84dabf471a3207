//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use listingforge_shared::{GeminiConfig, ListingForgeError, Result, parse_base_url};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::{GenerationRequest, TextGenerator};

/// Longest slice of an error body kept in an error message.
const ERROR_BODY_EXCERPT: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client, reading the API key from the configured env var.
    ///
    /// A missing key is not an error here; requests fail instead.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        Self::new(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn new(config: &GeminiConfig, api_key: Option<String>) -> Result<Self> {
        let base = parse_base_url(&config.base_url).map_err(|e| {
            ListingForgeError::config(format!("invalid gemini base_url '{}': {e}", config.base_url))
        })?;
        let endpoint = base
            .join(&format!("v1beta/models/{}:generateContent", config.model))
            .map_err(|e| ListingForgeError::config(format!("invalid gemini model: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ListingForgeError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ListingForgeError::Optimization("Gemini API key is not configured".into())
        })?;

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        };

        let response = self
            .client
            .post(self.endpoint.as_str())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ListingForgeError::Optimization(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ListingForgeError::Optimization(format!("failed to read Gemini response: {e}"))
        })?;

        if !status.is_success() {
            return Err(ListingForgeError::Optimization(format!(
                "Gemini API returned HTTP {status}: {}",
                excerpt(&text)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            ListingForgeError::Optimization(format!(
                "invalid Gemini response envelope: {e} (got: {})",
                excerpt(&text)
            ))
        })?;

        let output = parsed.text();
        debug!(
            chars = output.as_ref().map_or(0, |t| t.len()),
            "gemini response received"
        );
        Ok(output)
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(ERROR_BODY_EXCERPT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::response_schema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..GeminiConfig::default()
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "be helpful".into(),
            user_prompt: "optimize this".into(),
            response_schema: response_schema(),
        }
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(&GeminiConfig::default(), None).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = GeminiClient::new(&config_for("https://gateway.example/google"), None).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://gateway.example/google/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "ü".repeat(400);
        assert_eq!(excerpt(&text).chars().count(), ERROR_BODY_EXCERPT);
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn sends_structured_output_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "be helpful" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "optimize this" }] }],
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server.uri()), Some("test-key".into())).unwrap();
        let text = client.generate(&request()).await.unwrap();
        assert_eq!(text.as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn no_candidates_is_empty_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server.uri()), Some("k".into())).unwrap();
        assert_eq!(client.generate(&request()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn http_error_is_optimization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server.uri()), Some("k".into())).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ListingForgeError::Optimization(_)));
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_calling_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server.uri()), None).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("API key is not configured"));
    }
}
