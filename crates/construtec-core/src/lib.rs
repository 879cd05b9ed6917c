//! Construtec Core Library
//!
//! Shared functionality for the Construtec construction advisory service:
//! - Query enrichment and the Gemini advice call (with timeout)
//! - Normalization of replies into prose or structured tables
//! - Table sort/filter for materials and companies
//! - Search history (local SQLite or Supabase)
//! - Email/password authentication (local or Supabase)
//! - Prompt library and layered configuration

pub mod advisor;
pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod history;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod services;
pub mod table;

/// Test utilities including mock Gemini and Supabase servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advisor::{Advisor, SearchOutcome};
pub use ai::{AIClient, AdviceBackend, GeminiBackend, MockBackend};
pub use auth::{AuthProvider, LocalAuth, SignUpOutcome, SupabaseAuth};
pub use config::{AiConfig, Config, SupabaseConfig};
pub use db::Database;
pub use enrich::enrich_query;
pub use error::{Error, Result};
pub use history::{HistoryStore, SupabaseStore};
pub use models::*;
pub use normalize::{normalize, Normalized};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use services::Services;
pub use table::{SortConfig, SortDirection, TableState};
