//! Search history operations
//!
//! Every query is scoped to the owning user.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, HistorySession, Role, StoredMessage};

impl Database {
    /// Create a session row and return its id
    pub fn create_session(&self, user_id: &str, title: &str, status: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, title, status) VALUES (?, ?, ?, ?)",
            params![id, user_id, title, status],
        )?;
        Ok(id)
    }

    /// Append a message to a session
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        category: Option<Category>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, category) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                session_id,
                role.as_str(),
                content,
                category.map(|c| c.as_str())
            ],
        )?;
        Ok(id)
    }

    /// Sessions for `user_id`, newest first
    pub fn list_sessions(&self, user_id: &str) -> Result<Vec<HistorySession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, status, created_at FROM sessions
             WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let sessions = stmt
            .query_map(params![user_id], |row| {
                let created_at: String = row.get(4)?;
                Ok(HistorySession {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    status: row.get(3)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Whether `session_id` exists and belongs to `user_id`
    fn owns_session(&self, user_id: &str, session_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ? AND user_id = ?",
                params![session_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Messages of one session, oldest first
    pub fn list_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<StoredMessage>> {
        if !self.owns_session(user_id, session_id)? {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, category, created_at FROM messages
             WHERE session_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let messages = stmt
            .query_map(params![session_id], |row| {
                let role: String = row.get(2)?;
                let category: Option<String> = row.get(4)?;
                let created_at: String = row.get(5)?;
                Ok(StoredMessage {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    role: role.parse().unwrap_or(Role::Assistant),
                    content: row.get(3)?,
                    category: category.and_then(|c| c.parse().ok()),
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Delete a session and its messages
    pub fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM sessions WHERE id = ? AND user_id = ?",
            params![session_id, user_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }
        Ok(())
    }
}
