//! Authentication
//!
//! Email/password accounts behind one trait. `LocalAuth` keeps accounts in
//! the SQLite database; `SupabaseAuth` talks to a Supabase project's auth
//! API. Both hand out a `UserSession` that callers pass along explicitly.

mod local;
mod supabase;

pub use local::LocalAuth;
pub use supabase::SupabaseAuth;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::UserSession;

/// Id of the implicit user when authentication is switched off
pub const LOCAL_USER_ID: &str = "local";
pub const LOCAL_USER_EMAIL: &str = "local@construtec";

/// Shown after a sign-up that still needs the email confirmed
pub const CONFIRM_EMAIL_MESSAGE: &str = "Registo efetuado! Verifique o seu email.";

/// Result of a sign-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn(UserSession),
    /// Account created; the provider wants the email confirmed first
    ConfirmationRequired { email: String },
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;

    /// Invalidate the session's access token
    async fn sign_out(&self, session: &UserSession) -> Result<()>;

    /// Resolve an access token; `Error::Auth` when it is unknown or expired
    async fn current_user(&self, access_token: &str) -> Result<UserSession>;

    fn name(&self) -> &'static str;
}

/// Session used when authentication is disabled
pub fn local_session() -> UserSession {
    UserSession {
        user_id: LOCAL_USER_ID.to_string(),
        email: LOCAL_USER_EMAIL.to_string(),
        access_token: String::new(),
    }
}
