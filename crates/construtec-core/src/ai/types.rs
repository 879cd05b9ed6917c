//! AI backend request/response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};

use crate::models::Citation;

/// Sampling temperature for every advice call
pub const ADVICE_TEMPERATURE: f32 = 0.3;

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The enriched user prompt
    pub prompt: String,
    /// Category-specific system instruction
    pub system_instruction: String,
    /// Enable web-search grounding
    pub web_search: bool,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: &str, system_instruction: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.to_string(),
            web_search: true,
            temperature: ADVICE_TEMPERATURE,
        }
    }
}

/// Raw completion result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    /// Concatenated text parts; `None` when the service returned no text
    pub text: Option<String>,
    pub grounding: Option<GroundingMetadata>,
}

/// Grounding metadata as returned by search-augmented models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebChunk {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

impl GroundingMetadata {
    /// Flatten web chunks into citations, dropping chunks without a web source
    pub fn citations(&self) -> Vec<Citation> {
        self.grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .map(|web| Citation {
                title: web.title.clone(),
                url: web.uri.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citations_drop_non_web_chunks() {
        let metadata: GroundingMetadata = serde_json::from_str(
            r#"{"groundingChunks": [
                {"web": {"uri": "https://www.leroymerlin.pt/x", "title": "leroymerlin.pt"}},
                {},
                {"retrievedContext": {"uri": "gs://bucket"}},
                {"web": {"uri": "https://maxmat.pt/y", "title": "maxmat.pt"}}
            ]}"#,
        )
        .unwrap();

        let citations = metadata.citations();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "leroymerlin.pt");
        assert_eq!(citations[1].url, "https://maxmat.pt/y");
    }

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("prompt", "system");
        assert!(request.web_search);
        assert_eq!(request.temperature, 0.3);
    }
}
