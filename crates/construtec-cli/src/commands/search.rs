//! Search command implementation

use anyhow::{bail, Result};
use tracing::warn;

use construtec_core::history::persist_in_background;
use construtec_core::{Category, SearchOutcome, Services, TableState, UserSession};

use super::render_message;

/// Run one search and, when it succeeded and `save` is set, store it
///
/// The history write runs in the background like the server's, but the CLI
/// waits for it so the process does not exit mid-write.
pub async fn run_search(
    services: &Services,
    user: &UserSession,
    query: &str,
    category: Category,
    save: bool,
) -> Result<SearchOutcome> {
    let query = query.trim();
    if query.is_empty() {
        bail!("A pesquisa não pode estar vazia.");
    }

    let outcome = services.advisor.search(query, category).await;

    if save {
        if let Some(result) = &outcome.result {
            let handle = persist_in_background(
                services.history.clone(),
                user.clone(),
                query.to_string(),
                category,
                result.clone(),
            );
            if let Err(e) = handle.await {
                warn!(error = %e, "History task did not finish");
            }
        }
    }

    Ok(outcome)
}

pub async fn cmd_search(
    services: &Services,
    user: &UserSession,
    query: &str,
    category: Category,
    state: &TableState,
    save: bool,
    json: bool,
) -> Result<()> {
    if !json {
        println!("🔍 A pesquisar ({})...", category);
        println!();
    }

    let outcome = run_search(services, user, query, category, save).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.message)?);
    } else {
        println!("{}", render_message(&outcome.message, state));
    }

    Ok(())
}
