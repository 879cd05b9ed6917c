//! Search history
//!
//! `HistoryStore` is the seam between the search pipeline and whatever keeps
//! the query/response pairs: the local SQLite `Database` or a hosted
//! Supabase project (`SupabaseStore`). Every call carries the signed-in
//! `UserSession`; stores scope reads and writes to that user.

mod supabase;

pub use supabase::SupabaseStore;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    AdviceResult, Category, DataType, HistorySession, Message, Role, StoredMessage,
    StructuredData, UserSession,
};

/// Status written for every search session (one round-trip, then done)
pub const SESSION_STATUS_CLOSED: &str = "closed";

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create a session and return its id
    async fn create_session(&self, user: &UserSession, title: &str) -> Result<String>;

    async fn append_message(
        &self,
        user: &UserSession,
        session_id: &str,
        role: Role,
        content: &str,
        category: Option<Category>,
    ) -> Result<()>;

    /// Newest first
    async fn list_sessions(&self, user: &UserSession) -> Result<Vec<HistorySession>>;

    /// Oldest first
    async fn list_messages(&self, user: &UserSession, session_id: &str) -> Result<Vec<StoredMessage>>;

    async fn delete_session(&self, user: &UserSession, session_id: &str) -> Result<()>;

    /// Short label for logs and `status`
    fn name(&self) -> &'static str;
}

#[async_trait]
impl HistoryStore for Database {
    async fn create_session(&self, user: &UserSession, title: &str) -> Result<String> {
        Database::create_session(self, &user.user_id, title, SESSION_STATUS_CLOSED)
    }

    async fn append_message(
        &self,
        _user: &UserSession,
        session_id: &str,
        role: Role,
        content: &str,
        category: Option<Category>,
    ) -> Result<()> {
        Database::append_message(self, session_id, role, content, category)?;
        Ok(())
    }

    async fn list_sessions(&self, user: &UserSession) -> Result<Vec<HistorySession>> {
        Database::list_sessions(self, &user.user_id)
    }

    async fn list_messages(&self, user: &UserSession, session_id: &str) -> Result<Vec<StoredMessage>> {
        Database::list_messages(self, &user.user_id, session_id)
    }

    async fn delete_session(&self, user: &UserSession, session_id: &str) -> Result<()> {
        Database::delete_session(self, &user.user_id, session_id)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Store one search: session titled with the raw query, then the user
/// message, then the assistant message (JSON array for tables)
pub async fn save_interaction(
    store: &dyn HistoryStore,
    user: &UserSession,
    query: &str,
    category: Category,
    result: &AdviceResult,
) -> Result<String> {
    let persist = |e: Error| Error::Persistence(e.to_string());

    let content = result.stored_content().map_err(persist)?;
    let session_id = store.create_session(user, query).await.map_err(persist)?;
    store
        .append_message(user, &session_id, Role::User, query, Some(category))
        .await
        .map_err(persist)?;
    store
        .append_message(user, &session_id, Role::Assistant, &content, Some(category))
        .await
        .map_err(persist)?;

    debug!(session = %session_id, store = store.name(), "Saved interaction");
    Ok(session_id)
}

/// Fire-and-forget `save_interaction`; failures are logged, never returned
pub fn persist_in_background(
    store: Arc<dyn HistoryStore>,
    user: UserSession,
    query: String,
    category: Category,
    result: AdviceResult,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = save_interaction(store.as_ref(), &user, &query, category, &result).await {
            warn!(error = %e, store = store.name(), "Failed to save search history");
        }
    })
}

/// Rebuild a presentation message from a stored row
///
/// Assistant rows with a stored data category are parsed as that category's
/// array. Rows without a category fall back to sniffing the content.
pub fn rehydrate(stored: &StoredMessage) -> Message {
    if stored.role == Role::User {
        return Message::user(&stored.content);
    }

    let (data, data_type) = match stored.category {
        Some(category) if category.is_data() => (
            StructuredData::from_json(stored.content.trim(), category).ok(),
            category.data_type(),
        ),
        Some(_) => (None, DataType::Text),
        None => match detect_structured(&stored.content) {
            Some(data) => {
                let data_type = data.data_type();
                (Some(data), data_type)
            }
            None => (None, DataType::Text),
        },
    };

    Message {
        role: Role::Assistant,
        content: if data.is_some() {
            None
        } else {
            Some(stored.content.clone())
        },
        data,
        data_type,
        sources: Vec::new(),
    }
}

/// Recover a table from stored text that carries no category
///
/// Text starting with `[` or `{` is parsed as JSON; a non-empty array whose
/// first element has `preco_numerico` is materials, `nome` or `contacto` is
/// companies.
pub fn detect_structured(content: &str) -> Option<StructuredData> {
    let trimmed = content.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let first = value.as_array()?.first()?.as_object()?;

    let category = if first.contains_key("preco_numerico") {
        Category::Materiais
    } else if first.contains_key("nome") || first.contains_key("contacto") {
        Category::Empresas
    } else {
        return None;
    };

    StructuredData::from_json(trimmed, category).ok()
}
