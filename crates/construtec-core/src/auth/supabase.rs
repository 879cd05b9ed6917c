//! Supabase auth (GoTrue) over HTTP

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{AuthProvider, SignUpOutcome};
use crate::config::SupabaseConfig;
use crate::error::{Error, Result};
use crate::models::UserSession;

#[derive(Clone)]
pub struct SupabaseAuth {
    http_client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Token grant and auto-confirmed sign-up both answer with this shape;
/// a sign-up that needs confirmation answers with the bare user instead
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue error bodies vary between versions
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

impl SupabaseAuth {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        Err(Error::Auth(message))
    }

    fn session(token: TokenResponse, fallback_email: &str) -> Option<UserSession> {
        let access_token = token.access_token?;
        let user = token.user?;
        Some(UserSession {
            user_id: user.id,
            email: user.email.unwrap_or_else(|| fallback_email.to_string()),
            access_token,
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession> {
        let response = self
            .http_client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;

        let session = Self::session(token, email)
            .ok_or_else(|| Error::Auth("Resposta de autenticação incompleta.".into()))?;
        info!(user = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .http_client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;

        let confirm_email = token.email.clone().unwrap_or_else(|| email.to_string());
        Ok(match Self::session(token, email) {
            Some(session) => SignUpOutcome::SignedIn(session),
            None => SignUpOutcome::ConfirmationRequired {
                email: confirm_email,
            },
        })
    }

    async fn sign_out(&self, session: &UserSession) -> Result<()> {
        let response = self
            .http_client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<UserSession> {
        let response = self
            .http_client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let user: AuthUser = Self::check(response).await?.json().await?;

        Ok(UserSession {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            access_token: access_token.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_message_priority() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: ErrorBody = serde_json::from_str(r#"{"msg":"User already registered"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("User already registered"));
    }

    #[test]
    fn test_signup_without_token_needs_confirmation() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"id":"abc","email":"ana@obra.pt"}"#).unwrap();
        assert!(SupabaseAuth::session(token, "ana@obra.pt").is_none());

        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"jwt","user":{"id":"abc","email":"ana@obra.pt"}}"#,
        )
        .unwrap();
        let session = SupabaseAuth::session(token, "x").unwrap();
        assert_eq!(session.user_id, "abc");
        assert_eq!(session.access_token, "jwt");
    }

    #[tokio::test]
    async fn test_full_auth_flow_against_mock() {
        use crate::test_utils::{MockSupabaseServer, MOCK_SUPABASE_ANON_KEY};

        let server = MockSupabaseServer::start().await;
        let auth = SupabaseAuth::new(&server.url(), MOCK_SUPABASE_ANON_KEY);

        let created = match auth.sign_up("ana@obra.pt", "segredo123").await.unwrap() {
            SignUpOutcome::SignedIn(session) => session,
            other => panic!("expected a session, got {:?}", other),
        };

        let err = auth.sign_up("ana@obra.pt", "outra").await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication error: User already registered");

        let err = auth.sign_in("ana@obra.pt", "errada").await.unwrap_err();
        assert!(err.to_string().contains("Invalid login credentials"));

        let session = auth.sign_in("ana@obra.pt", "segredo123").await.unwrap();
        assert_eq!(session.user_id, created.user_id);

        let me = auth.current_user(&session.access_token).await.unwrap();
        assert_eq!(me.email, "ana@obra.pt");

        auth.sign_out(&session).await.unwrap();
        assert!(matches!(
            auth.current_user(&session.access_token).await,
            Err(Error::Auth(_))
        ));
    }
}
