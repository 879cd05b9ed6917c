//! Pluggable AI backend abstraction
//!
//! This module provides a backend-agnostic interface for the advice call.
//!
//! # Architecture
//!
//! - `AdviceBackend` trait: defines the interface for all AI backends
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = Config::load(None)?;
//! let ai = AIClient::from_config(&config.ai);
//! let reply = ai.generate(&GenerationRequest::new(prompt, system)).await?;
//! ```
//!
//! # Configuration
//!
//! Environment variables (see `config` for the full resolution order):
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (checked lazily, at search time)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.5-flash)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)

mod gemini;
mod mock;
pub mod parsing;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};
pub use types::*;

use async_trait::async_trait;

use crate::config::AiConfig;
use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AdviceBackend: Send + Sync {
    /// Run one completion with the given system instruction and prompt
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;

    /// Check if the backend is reachable and the credentials are accepted
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini with Google Search grounding
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from resolved configuration
    ///
    /// Checks `backend` to determine which backend to use:
    /// - `gemini` (default)
    /// - `mock`: canned replies, no network
    ///
    /// A missing API key is not an error here; the Gemini backend reports it
    /// when a search is attempted so the rest of the service keeps working.
    pub fn from_config(config: &AiConfig) -> Self {
        match config.backend.to_lowercase().as_str() {
            "gemini" | "google" => AIClient::Gemini(GeminiBackend::from_config(config)),
            "mock" => AIClient::Mock(MockBackend::new()),
            other => {
                tracing::warn!(backend = %other, "Unknown AI_BACKEND, falling back to gemini");
                AIClient::Gemini(GeminiBackend::from_config(config))
            }
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(host: &str, model: &str, api_key: Option<&str>) -> Self {
        AIClient::Gemini(GeminiBackend::new(host, model, api_key))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl AdviceBackend for AIClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        match self {
            AIClient::Gemini(b) => b.generate(request).await,
            AIClient::Mock(b) => b.generate(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = AiConfig::default();
        config.backend = "mock".into();
        assert!(matches!(AIClient::from_config(&config), AIClient::Mock(_)));

        config.backend = "gemini".into();
        assert!(matches!(AIClient::from_config(&config), AIClient::Gemini(_)));

        config.backend = "something-else".into();
        assert!(matches!(AIClient::from_config(&config), AIClient::Gemini(_)));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }
}
