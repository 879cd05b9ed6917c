//! History command implementations (list, show, delete)

use anyhow::{Context, Result};
use chrono::Local;

use construtec_core::history::rehydrate;
use construtec_core::{Services, TableState, UserSession};

use super::{render_message, truncate};

pub async fn cmd_history_list(services: &Services, user: &UserSession) -> Result<()> {
    let sessions = services
        .history
        .list_sessions(user)
        .await
        .context("Failed to load history")?;

    if sessions.is_empty() {
        println!("No saved searches yet.");
        println!("Try: construtec search -c materiais tijolo 30x20");
        return Ok(());
    }

    println!();
    println!("{:<36}  {:<16}  TITLE", "ID", "DATE");
    println!("{}", "-".repeat(90));
    for session in &sessions {
        println!(
            "{:<36}  {:<16}  {}",
            session.id,
            session
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            truncate(session.title.as_deref().unwrap_or("(sem título)"), 34)
        );
    }
    println!();
    println!("{} saved searches", sessions.len());

    Ok(())
}

pub async fn cmd_history_show(
    services: &Services,
    user: &UserSession,
    id: &str,
    state: &TableState,
) -> Result<()> {
    let messages = services
        .history
        .list_messages(user, id)
        .await
        .with_context(|| format!("Failed to load search {}", id))?;

    for stored in &messages {
        println!("{}", render_message(&rehydrate(stored), state));
        println!();
    }

    Ok(())
}

pub async fn cmd_history_delete(services: &Services, user: &UserSession, id: &str) -> Result<()> {
    services
        .history
        .delete_session(user, id)
        .await
        .with_context(|| format!("Failed to delete search {}", id))?;

    println!("🗑️  Deleted search {}", id);
    Ok(())
}
