//! Mock backend for testing
//!
//! Provides configurable mock replies for the advice call.
//! Useful for unit tests and development without a Gemini API key.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{GenerationRequest, GenerationResponse, GroundingChunk, GroundingMetadata, WebChunk};
use super::AdviceBackend;

/// What the mock answers with
#[derive(Clone, Debug, Default)]
pub enum MockReply {
    /// Pick a canned reply from the shape the system instruction asks for
    #[default]
    Canned,
    /// Always answer with this text
    Text(String),
    /// Answer with no text at all
    Empty,
    /// Fail every call with a service error
    Fail(String),
}

/// Mock AI backend for testing
///
/// Returns predictable responses. Can be configured with a custom reply or a
/// delay for specific tests.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    reply: MockReply,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Create a new mock backend (healthy, canned replies)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Always answer with `text`
    pub fn with_reply(mut self, text: &str) -> Self {
        self.reply = MockReply::Text(text.to_string());
        self
    }

    /// Answer with no text
    pub fn empty(mut self) -> Self {
        self.reply = MockReply::Empty;
        self
    }

    /// Fail every call with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.reply = MockReply::Fail(message.to_string());
        self
    }

    /// Wait `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn canned(system_instruction: &str) -> &'static str {
        if system_instruction.contains("preco_numerico") {
            CANNED_MATERIALS
        } else if system_instruction.contains("especialidade") {
            CANNED_COMPANIES
        } else {
            CANNED_SOLUTION
        }
    }
}

const CANNED_MATERIALS: &str = r#"```json
[
  {"produto": "Tijolo 30x20x11", "marca": "Preceram", "preco_numerico": 0.42, "preco_texto": "0,42 €/un", "loja": "Leroy Merlin", "link": "https://www.leroymerlin.pt", "obs": "Palete de 120"},
  {"produto": "Tijolo 30x20x15", "marca": "Cerâmica Vale da Gândara", "preco_numerico": 0.55, "preco_texto": "0,55 €/un", "loja": "Maxmat"}
]
```"#;

const CANNED_COMPANIES: &str = r#"[
  {"nome": "Obras Norte Lda", "local": "Braga", "contacto": "+351 253 000 000", "especialidade": "Remodelações"},
  {"nome": "Telhados Silva", "local": "Porto", "contacto": "912 345 678", "especialidade": "Coberturas"}
]"#;

const CANNED_SOLUTION: &str = "### Diagnóstico\n\nA solução mais comum em Portugal passa por **isolamento térmico pelo exterior** (ETICS).\n\n- Placas de EPS ou XPS\n- Rede de fibra de vidro\n- Reboco armado";

#[async_trait]
impl AdviceBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = match &self.reply {
            MockReply::Canned => Some(Self::canned(&request.system_instruction).to_string()),
            MockReply::Text(text) => Some(text.clone()),
            MockReply::Empty => None,
            MockReply::Fail(message) => return Err(Error::Service(message.clone())),
        };

        let grounding = request.web_search.then(|| GroundingMetadata {
            grounding_chunks: vec![
                GroundingChunk {
                    web: Some(WebChunk {
                        uri: "https://www.leroymerlin.pt".to_string(),
                        title: "leroymerlin.pt".to_string(),
                    }),
                },
                GroundingChunk { web: None },
            ],
        });

        Ok(GenerationResponse { text, grounding })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_reply_follows_instruction_shape() {
        let mock = MockBackend::new();

        let materials = mock
            .generate(&GenerationRequest::new("q", "Campos: produto, preco_numerico"))
            .await
            .unwrap();
        assert!(materials.text.unwrap().contains("Tijolo"));

        let companies = mock
            .generate(&GenerationRequest::new("q", "Campos: nome, especialidade"))
            .await
            .unwrap();
        assert!(companies.text.unwrap().contains("Obras Norte"));

        let prose = mock
            .generate(&GenerationRequest::new("q", "Responde em markdown"))
            .await
            .unwrap();
        assert!(prose.text.unwrap().starts_with("###"));
    }

    #[tokio::test]
    async fn test_grounding_keeps_only_web_chunks() {
        let response = MockBackend::new()
            .generate(&GenerationRequest::new("q", "s"))
            .await
            .unwrap();
        assert_eq!(response.grounding.unwrap().citations().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_failing() {
        let empty = MockBackend::new()
            .empty()
            .generate(&GenerationRequest::new("q", "s"))
            .await
            .unwrap();
        assert!(empty.text.is_none());

        let err = MockBackend::new()
            .failing("quota")
            .generate(&GenerationRequest::new("q", "s"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service(m) if m == "quota"));
    }

    #[tokio::test]
    async fn test_unhealthy() {
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
