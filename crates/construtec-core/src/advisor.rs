//! Search pipeline
//!
//! enrich -> advice call (raced against the timeout) -> normalize -> message.
//!
//! Every failure of the advice call ends up as one prose message so callers
//! always have something to show.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ai::{AIClient, AdviceBackend, GenerationRequest};
use crate::config::Config;
use crate::enrich::enrich_query;
use crate::error::{Error, Result};
use crate::models::{AdviceResult, Category, Message, Role};
use crate::normalize::normalize;
use crate::prompts::PromptLibrary;

/// Shown when a result carries neither data nor text
pub const FALLBACK_TEXT: &str = "Não foi possível gerar uma resposta. Tente novamente.";

/// Appended to every search error
pub const CONFIG_HINT: &str = "Se estiver a configurar o servidor, certifique-se que a variável **GEMINI_API_KEY** está definida nas configurações.";

/// Runs searches against one AI backend
#[derive(Clone)]
pub struct Advisor {
    client: AIClient,
    prompts: Arc<PromptLibrary>,
    timeout: Duration,
}

/// Outcome of one search: the message to show plus the normalized result
/// when the advice call succeeded (used for persistence)
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub message: Message,
    pub result: Option<AdviceResult>,
}

impl Advisor {
    pub fn new(client: AIClient, prompts: Arc<PromptLibrary>, timeout: Duration) -> Self {
        Self {
            client,
            prompts,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AIClient::from_config(&config.ai),
            Arc::new(PromptLibrary::new()),
            config.ai.timeout,
        )
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One advice call for an already enriched prompt
    ///
    /// The in-flight request is dropped (and its connection closed) when the
    /// timeout fires first.
    pub async fn get_advice(&self, enriched: &str, category: Category) -> Result<AdviceResult> {
        let system = self
            .prompts
            .system_instruction(category)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        let request = GenerationRequest::new(enriched, &system);

        debug!(
            category = %category,
            backend = self.client.host(),
            model = self.client.model(),
            "Requesting advice"
        );

        let response = match tokio::time::timeout(self.timeout, self.client.generate(&request)).await
        {
            Err(_) => {
                warn!(category = %category, timeout_secs = self.timeout.as_secs(), "Advice call timed out");
                return Err(Error::Timeout(timeout_message(self.timeout)));
            }
            Ok(Err(e)) => return Err(as_service_error(e)),
            Ok(Ok(response)) => response,
        };

        let raw = response
            .text
            .filter(|t| !t.is_empty())
            .ok_or(Error::EmptyResponse)?;
        let citations = response
            .grounding
            .map(|g| g.citations())
            .unwrap_or_default();

        let normalized = normalize(&raw, category);
        Ok(AdviceResult {
            text: normalized.text,
            structured: normalized.data,
            citations,
        })
    }

    /// Full pipeline for a raw user query
    pub async fn search(&self, query: &str, category: Category) -> SearchOutcome {
        let enriched = enrich_query(query, category);

        match self.get_advice(&enriched, category).await {
            Ok(result) => {
                info!(
                    category = %category,
                    structured = result.structured.is_some(),
                    citations = result.citations.len(),
                    "Search complete"
                );
                SearchOutcome {
                    message: result_message(&result, category),
                    result: Some(result),
                }
            }
            Err(e) => {
                warn!(category = %category, error = %e, "Search failed");
                SearchOutcome {
                    message: Message::assistant_text(&error_prose(&e)),
                    result: None,
                }
            }
        }
    }
}

/// User-facing timeout message
pub fn timeout_message(timeout: Duration) -> String {
    format!(
        "A pesquisa excedeu o tempo limite ({}s). Tente ser mais específico.",
        timeout.as_secs()
    )
}

/// Anything other than the advice-call taxonomy becomes a service error
fn as_service_error(e: Error) -> Error {
    match e {
        Error::Configuration(_) | Error::Timeout(_) | Error::EmptyResponse | Error::Service(_) => e,
        other => Error::Service(other.to_string()),
    }
}

/// Prose shown in place of a result when the advice call fails
pub fn error_prose(error: &Error) -> String {
    let message = error.to_string();
    let message = if message.is_empty() {
        "Ocorreu um erro inesperado.".to_string()
    } else {
        message
    };
    format!("### Erro na Pesquisa\n\n{}\n\n{}", message, CONFIG_HINT)
}

/// Presentation message for a successful advice call
///
/// Data categories carry the table when one was parsed; everything else
/// carries prose, with a fallback when the prose is empty.
pub fn result_message(result: &AdviceResult, category: Category) -> Message {
    let (content, data) = match &result.structured {
        Some(data) if category.is_data() => (None, Some(data.clone())),
        _ => {
            let text = if result.text.is_empty() {
                FALLBACK_TEXT.to_string()
            } else {
                result.text.clone()
            };
            (Some(text), None)
        }
    };

    Message {
        role: Role::Assistant,
        content,
        data,
        data_type: category.data_type(),
        sources: result.citations.clone(),
    }
}
