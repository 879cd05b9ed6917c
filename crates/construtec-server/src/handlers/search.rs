//! Search handler
//!
//! Runs the advice pipeline and saves successful results to the user's
//! history in the background.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState};
use construtec_core::history::persist_in_background;
use construtec_core::{Category, Message, UserSession};

/// Request body for a search
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub category: Category,
}

/// POST /api/search
///
/// Always answers 200 with a message; advice failures come back as prose.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Message>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::bad_request("A pesquisa não pode estar vazia."));
    }

    info!(user = %user.user_id, category = %req.category, "Search");
    let outcome = state.services.advisor.search(query, req.category).await;

    if let Some(result) = outcome.result {
        persist_in_background(
            state.services.history.clone(),
            user,
            query.to_string(),
            req.category,
            result,
        );
    }

    Ok(Json(outcome.message))
}
