//! Accounts stored in the local database

use async_trait::async_trait;
use tracing::info;

use super::{AuthProvider, SignUpOutcome};
use crate::db::{Database, UserRecord};
use crate::error::{Error, Result};
use crate::models::UserSession;

const INVALID_CREDENTIALS: &str = "Credenciais inválidas.";

#[derive(Clone)]
pub struct LocalAuth {
    db: Database,
}

impl LocalAuth {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Run `f` on the blocking pool; argon2 hashing would stall the runtime
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

fn issue_session(db: &Database, user: UserRecord) -> Result<UserSession> {
    let access_token = db.create_token(&user.id)?;
    Ok(UserSession {
        user_id: user.id,
        email: user.email,
        access_token,
    })
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession> {
        let (email, password) = (email.to_string(), password.to_string());
        self.blocking(move |db| {
            let user = db
                .verify_user(&email, &password)?
                .ok_or_else(|| Error::Auth(INVALID_CREDENTIALS.into()))?;
            info!(user = %user.id, "Signed in");
            issue_session(db, user)
        })
        .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let (email, password) = (email.to_string(), password.to_string());
        self.blocking(move |db| {
            let user = db.create_user(&email, &password)?;
            info!(user = %user.id, "Account created");
            Ok(SignUpOutcome::SignedIn(issue_session(db, user)?))
        })
        .await
    }

    async fn sign_out(&self, session: &UserSession) -> Result<()> {
        let token = session.access_token.clone();
        self.blocking(move |db| db.revoke_token(&token)).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<UserSession> {
        let token = access_token.to_string();
        let user = self
            .blocking(move |db| db.user_for_token(&token))
            .await?
            .ok_or_else(|| Error::Auth("Sessão inválida ou expirada.".into()))?;
        Ok(UserSession {
            user_id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_signup_signin_signout() {
        let auth = LocalAuth::new(Database::in_memory().unwrap());

        let session = match auth.sign_up("ana@obra.pt", "segredo123").await.unwrap() {
            SignUpOutcome::SignedIn(session) => session,
            other => panic!("expected a session, got {:?}", other),
        };
        assert_eq!(session.email, "ana@obra.pt");

        let again = auth.sign_in("ana@obra.pt", "segredo123").await.unwrap();
        assert_eq!(again.user_id, session.user_id);
        assert_ne!(again.access_token, session.access_token);

        let me = auth.current_user(&again.access_token).await.unwrap();
        assert_eq!(me, again);

        auth.sign_out(&again).await.unwrap();
        assert!(matches!(
            auth.current_user(&again.access_token).await,
            Err(Error::Auth(_))
        ));
        // The other token is still valid
        assert!(auth.current_user(&session.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = LocalAuth::new(Database::in_memory().unwrap());
        auth.sign_up("ana@obra.pt", "segredo123").await.unwrap();
        let err = auth.sign_in("ana@obra.pt", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication error: Credenciais inválidas.");
    }

    #[tokio::test]
    async fn test_password_check_leaves_runtime_free() {
        let auth = LocalAuth::new(Database::in_memory().unwrap());
        auth.sign_up("ana@obra.pt", "segredo123").await.unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        // Single-threaded runtime: the ticker only runs if sign_in yields
        auth.sign_in("ana@obra.pt", "segredo123").await.unwrap();
        ticker.abort();
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }
}
