//! Gemini backend implementation
//!
//! HTTP client for the Gemini `generateContent` REST API with the Google
//! Search tool enabled, so answers come back grounded with web citations.
//!
//! The search tool cannot be combined with a JSON response schema, so the
//! data categories rely on the system instruction plus `parsing` to recover
//! the array from free text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{Error, Result};

use super::types::{GenerationRequest, GenerationResponse, GroundingMetadata};
use super::AdviceBackend;

/// Shown when a search is attempted without an API key
pub const MISSING_API_KEY_MESSAGE: &str = "A chave GEMINI_API_KEY não foi encontrada. Verifique as variáveis de ambiente do servidor.";

/// API key header accepted by the Gemini REST API
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(base_url: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(&config.host, &config.model, config.api_key.as_deref())
    }

    /// Whether an API key was resolved
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration(MISSING_API_KEY_MESSAGE.to_string()))
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response body from `generateContent`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
    }
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![text_part(&request.prompt)],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![text_part(&request.system_instruction)],
            },
            tools: if request.web_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                vec![]
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }
}

impl GenerateContentResponse {
    fn into_generation_response(self) -> GenerationResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return GenerationResponse::default();
        };

        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        GenerationResponse {
            text: if text.is_empty() { None } else { Some(text) },
            grounding: candidate.grounding_metadata,
        }
    }
}

#[async_trait]
impl AdviceBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let api_key = self.api_key()?;
        let body = GenerateContentRequest::from_request(request);

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            web_search = request.web_search,
            "Sending Gemini request"
        );

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Service(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.into_generation_response())
    }

    async fn health_check(&self) -> bool {
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        self.http_client
            .get(format!("{}/v1beta/models/{}", self.base_url, self.model))
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::new("Solução para: \"x\"", "És um consultor.");
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Solução para: \"x\"");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "És um consultor.");
        assert!(body["tools"][0]["google_search"].is_object());
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_request_without_search_omits_tools() {
        let mut request = GenerationRequest::new("p", "s");
        request.web_search = false;
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_response_parts_are_joined() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "[{\"nome\":"}, {"text": "\"A\"}]"}]},
                "groundingMetadata": {"groundingChunks": [{"web": {"uri": "https://a.pt", "title": "a.pt"}}]}
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let response = parsed.into_generation_response();
        assert_eq!(response.text.as_deref(), Some("[{\"nome\":\"A\"}]"));
        assert_eq!(response.grounding.unwrap().citations().len(), 1);
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(parsed.into_generation_response().text.is_none());

        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_generation_response().text.is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let backend = GeminiBackend::new("http://127.0.0.1:9", "gemini-2.5-flash", None);
        let err = backend
            .generate(&GenerationRequest::new("p", "s"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!backend.health_check().await);
    }

    #[test]
    fn test_empty_api_key_counts_as_missing() {
        let backend = GeminiBackend::new("http://x", "m", Some(""));
        assert!(!backend.has_api_key());
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        use crate::test_utils::{MockGeminiServer, MOCK_GEMINI_KEY};

        let server = MockGeminiServer::start("[{\"nome\":\"Obras Lda\"}]").await;
        let backend = GeminiBackend::new(&server.url(), "gemini-2.5-flash", Some(MOCK_GEMINI_KEY));

        assert!(backend.health_check().await);

        let response = backend
            .generate(&GenerationRequest::new("Encontrar empresas", "Devolve JSON"))
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("[{\"nome\":\"Obras Lda\"}]"));
        assert_eq!(response.grounding.unwrap().citations().len(), 1);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["systemInstruction"]["parts"][0]["text"], "Devolve JSON");
    }

    #[tokio::test]
    async fn test_wrong_key_and_server_errors() {
        use crate::test_utils::{MockGeminiServer, MOCK_GEMINI_KEY};
        use axum::http::StatusCode;

        let server = MockGeminiServer::start("ok").await;
        let backend = GeminiBackend::new(&server.url(), "gemini-2.5-flash", Some("wrong"));
        assert!(!backend.health_check().await);
        let err = backend.generate(&GenerationRequest::new("p", "s")).await.unwrap_err();
        assert!(matches!(err, Error::Service(m) if m.contains("403")));

        let failing = MockGeminiServer::start_failing(StatusCode::SERVICE_UNAVAILABLE).await;
        let backend = GeminiBackend::new(&failing.url(), "gemini-2.5-flash", Some(MOCK_GEMINI_KEY));
        let err = backend.generate(&GenerationRequest::new("p", "s")).await.unwrap_err();
        assert!(matches!(err, Error::Service(m) if m.contains("503")));
    }
}
