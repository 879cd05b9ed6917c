//! Supabase-backed history (PostgREST)
//!
//! Requests carry the user's access token, so the project's row-level
//! security policies decide what each user can see.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{HistoryStore, SESSION_STATUS_CLOSED};
use crate::config::SupabaseConfig;
use crate::error::{Error, Result};
use crate::models::{Category, HistorySession, Role, StoredMessage, UserSession};

#[derive(Clone)]
pub struct SupabaseStore {
    http_client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct NewSession<'a> {
    user_id: &'a str,
    title: &'a str,
    status: &'a str,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    session_id: &'a str,
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SessionRow {
    id: String,
    user_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
    created_at: DateTime<Utc>,
}

/// The hosted `messages` table has no category column, so the category of a
/// structured reply is recovered from its payload when read back.
#[derive(Deserialize)]
struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    #[serde(default)]
    content: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for HistorySession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            status: row.status.unwrap_or_else(|| SESSION_STATUS_CLOSED.to_string()),
            created_at: row.created_at,
        }
    }
}

impl From<MessageRow> for StoredMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            role: row.role.parse().unwrap_or(Role::Assistant),
            content: row.content.unwrap_or_default(),
            category: None,
            created_at: row.created_at,
        }
    }
}

impl SupabaseStore {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn from_config(config: &SupabaseConfig) -> Self {
        Self::new(&config.url, &config.anon_key)
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, request: RequestBuilder, user: &UserSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&user.access_token)
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Auth(format!("Supabase rejected {}: {}", what, body))
            }
            _ => Error::Persistence(format!("Supabase {} failed ({}): {}", what, status, body)),
        })
    }
}

#[async_trait]
impl HistoryStore for SupabaseStore {
    async fn create_session(&self, user: &UserSession, title: &str) -> Result<String> {
        let request = self
            .http_client
            .post(self.table("sessions"))
            .header("Prefer", "return=representation")
            .json(&NewSession {
                user_id: &user.user_id,
                title,
                status: SESSION_STATUS_CLOSED,
            });
        let response = Self::check(self.authed(request, user).send().await?, "create session").await?;

        let rows: Vec<SessionRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| Error::Persistence("Supabase returned no session row".into()))
    }

    async fn append_message(
        &self,
        user: &UserSession,
        session_id: &str,
        role: Role,
        content: &str,
        _category: Option<Category>,
    ) -> Result<()> {
        let request = self.http_client.post(self.table("messages")).json(&NewMessage {
            session_id,
            role: role.as_str(),
            content,
        });
        Self::check(self.authed(request, user).send().await?, "append message").await?;
        Ok(())
    }

    async fn list_sessions(&self, user: &UserSession) -> Result<Vec<HistorySession>> {
        let request = self.http_client.get(self.table("sessions")).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", user.user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let response = Self::check(self.authed(request, user).send().await?, "list sessions").await?;

        let rows: Vec<SessionRow> = response.json().await?;
        Ok(rows.into_iter().map(HistorySession::from).collect())
    }

    async fn list_messages(&self, user: &UserSession, session_id: &str) -> Result<Vec<StoredMessage>> {
        let request = self.http_client.get(self.table("messages")).query(&[
            ("select", "*".to_string()),
            ("session_id", format!("eq.{}", session_id)),
            ("order", "created_at.asc".to_string()),
        ]);
        let response = Self::check(self.authed(request, user).send().await?, "list messages").await?;

        let rows: Vec<MessageRow> = response.json().await?;
        Ok(rows.into_iter().map(StoredMessage::from).collect())
    }

    async fn delete_session(&self, user: &UserSession, session_id: &str) -> Result<()> {
        // Messages first in case the foreign key does not cascade
        let request = self
            .http_client
            .delete(self.table("messages"))
            .query(&[("session_id", format!("eq.{}", session_id))]);
        Self::check(self.authed(request, user).send().await?, "delete messages").await?;

        let request = self.http_client.delete(self.table("sessions")).query(&[
            ("id", format!("eq.{}", session_id)),
            ("user_id", format!("eq.{}", user.user_id)),
        ]);
        Self::check(self.authed(request, user).send().await?, "delete session").await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthProvider, SignUpOutcome, SupabaseAuth};
    use crate::history::{rehydrate, save_interaction};
    use crate::models::{AdviceResult, CompanyItem, DataType, MaterialItem, StructuredData};
    use crate::test_utils::{MockSupabaseServer, MOCK_SUPABASE_ANON_KEY};

    async fn sign_up(server: &MockSupabaseServer, email: &str) -> UserSession {
        let auth = SupabaseAuth::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        match auth.sign_up(email, "segredo123").await.unwrap() {
            SignUpOutcome::SignedIn(session) => session,
            other => panic!("expected a session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_and_browse_history() {
        let server = MockSupabaseServer::start().await;
        let store = SupabaseStore::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        let user = sign_up(&server, "ana@obra.pt").await;

        let data = StructuredData::Companies(vec![CompanyItem {
            nome: "Obras Lda".into(),
            local: "Braga".into(),
            contacto: "253 000 000".into(),
            especialidade: "Telhados".into(),
        }]);
        let result = AdviceResult {
            text: String::new(),
            structured: Some(data.clone()),
            citations: vec![],
        };

        let first = save_interaction(&store, &user, "telhados Braga", Category::Empresas, &result)
            .await
            .unwrap();
        let second = save_interaction(&store, &user, "pladur", Category::Empresas, &result)
            .await
            .unwrap();
        assert_eq!(server.message_count(), 4);

        let sessions = store.list_sessions(&user).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second);
        assert_eq!(sessions[1].title.as_deref(), Some("telhados Braga"));
        assert_eq!(sessions[1].status, "closed");

        let messages = store.list_messages(&user, &first).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        let message = rehydrate(&messages[1]);
        assert_eq!(message.data_type, DataType::Empresas);
        assert_eq!(message.data, Some(data));

        store.delete_session(&user, &first).await.unwrap();
        assert_eq!(store.list_sessions(&user).await.unwrap().len(), 1);
        assert_eq!(server.message_count(), 2);
    }

    #[tokio::test]
    async fn test_materials_reply_is_recognized_without_category_column() {
        let server = MockSupabaseServer::start().await;
        let store = SupabaseStore::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        let user = sign_up(&server, "ana@obra.pt").await;

        let data = StructuredData::Materials(vec![MaterialItem {
            produto: "Cimento 25kg".into(),
            marca: "Secil".into(),
            preco_texto: "4,99 €".into(),
            preco_numerico: 4.99,
            loja: "Leroy Merlin".into(),
            link: None,
            obs: None,
        }]);
        let result = AdviceResult {
            text: String::new(),
            structured: Some(data.clone()),
            citations: vec![],
        };

        let session = save_interaction(&store, &user, "cimento", Category::Materiais, &result)
            .await
            .unwrap();
        let messages = store.list_messages(&user, &session).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].category, None);

        let message = rehydrate(&messages[1]);
        assert_eq!(message.data_type, DataType::Materiais);
        assert_eq!(message.data, Some(data));
    }

    #[tokio::test]
    async fn test_unknown_message_column_is_rejected() {
        let server = MockSupabaseServer::start().await;
        let user = sign_up(&server, "ana@obra.pt").await;
        let store = SupabaseStore::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        let session = store.create_session(&user, "cimento").await.unwrap();

        let response = Client::new()
            .post(format!("{}/rest/v1/messages", server.url()))
            .header("apikey", MOCK_SUPABASE_ANON_KEY)
            .bearer_auth(&user.access_token)
            .json(&serde_json::json!({
                "session_id": session,
                "role": "assistant",
                "content": "[]",
                "category": "materiais",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(server.message_count(), 0);
    }

    #[tokio::test]
    async fn test_rows_are_scoped_to_the_token_owner() {
        let server = MockSupabaseServer::start().await;
        let store = SupabaseStore::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        let ana = sign_up(&server, "ana@obra.pt").await;
        let rui = sign_up(&server, "rui@obra.pt").await;

        let session = store.create_session(&ana, "cimento").await.unwrap();
        assert!(store.list_sessions(&rui).await.unwrap().is_empty());
        assert!(store.list_messages(&rui, &session).await.unwrap().is_empty());

        let err = store
            .append_message(&rui, &session, Role::User, "intruso", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_auth_error() {
        let server = MockSupabaseServer::start().await;
        let store = SupabaseStore::new(&server.url(), MOCK_SUPABASE_ANON_KEY);
        let stale = UserSession {
            user_id: "x".into(),
            email: "x@y.pt".into(),
            access_token: "expired".into(),
        };
        assert!(matches!(store.list_sessions(&stale).await, Err(Error::Auth(_))));
    }
}
