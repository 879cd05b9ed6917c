//! Error types for Construtec

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unusable settings. Carries the user-facing message.
    #[error("{0}")]
    Configuration(String),

    /// The AI call did not settle in time. Carries the user-facing message.
    #[error("{0}")]
    Timeout(String),

    #[error("Resposta vazia da IA.")]
    EmptyResponse,

    #[error("AI service error: {0}")]
    Service(String),

    /// Structured-data extraction failed. Recovered locally by the normalizer.
    #[error("Parse error: {0}")]
    Parse(String),

    /// History write failed. Logged and swallowed by callers.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether this error belongs to the AI-call family that is shown to the
    /// user as a prose message instead of a result.
    pub fn is_advice_failure(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::Timeout(_)
                | Error::EmptyResponse
                | Error::Service(_)
                | Error::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
