//! Local accounts and bearer tokens

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};

/// A local account row (password hash excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| Error::Auth(format!("Failed to create salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn password_matches(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Tokens are only ever stored hashed
pub(crate) fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Database {
    /// Create a local account
    ///
    /// Fails with `Error::Auth` if the email is already registered.
    pub fn create_user(&self, email: &str, password: &str) -> Result<UserRecord> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Auth("Email inválido.".into()));
        }
        if password.len() < 6 {
            return Err(Error::Auth(
                "A palavra-passe deve ter pelo menos 6 caracteres.".into(),
            ));
        }

        let conn = self.conn()?;
        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(Error::Auth("Este email já está registado.".into()));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)",
            params![id, email, hash_password(password)?],
        )?;

        self.get_user(&id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Make sure an account with a fixed id exists (used for unauthenticated
    /// local mode)
    pub fn ensure_user(&self, id: &str, email: &str) -> Result<UserRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id, email, password_hash) VALUES (?, ?, '')",
            params![id, email],
        )?;
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Get an account by id
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                params![id],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(UserRecord {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Check credentials; `None` when the email is unknown or the password
    /// does not match
    pub fn verify_user(&self, email: &str, password: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![email.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id, stored)) if password_matches(password, &stored) => self.get_user(&id),
            _ => Ok(None),
        }
    }

    /// Issue a new bearer token for `user_id`
    pub fn create_token(&self, user_id: &str) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO auth_tokens (token_hash, user_id) VALUES (?, ?)",
            params![token_hash(&token), user_id],
        )?;
        Ok(token)
    }

    /// Resolve a bearer token to its account
    pub fn user_for_token(&self, token: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM auth_tokens WHERE token_hash = ?",
                params![token_hash(token)],
                |row| row.get(0),
            )
            .optional()?;

        match user_id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    /// Invalidate a bearer token. Returns whether it existed.
    pub fn revoke_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM auth_tokens WHERE token_hash = ?",
            params![token_hash(token)],
        )?;
        Ok(rows > 0)
    }
}
