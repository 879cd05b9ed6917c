//! History handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::{AppError, AppState, SuccessResponse};
use construtec_core::history::rehydrate;
use construtec_core::{HistorySession, Message, UserSession};

/// A session with its messages ready for display
#[derive(Serialize)]
pub struct SessionDetail {
    pub id: String,
    pub messages: Vec<Message>,
}

/// GET /api/history - Sessions, newest first
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
) -> Result<Json<Vec<HistorySession>>, AppError> {
    let sessions = state.services.history.list_sessions(&user).await?;
    Ok(Json(sessions))
}

/// GET /api/history/:id - Messages of one session, oldest first
pub async fn get_history_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, AppError> {
    let stored = state.services.history.list_messages(&user, &id).await?;
    let messages = stored.iter().map(rehydrate).collect();
    Ok(Json(SessionDetail { id, messages }))
}

/// DELETE /api/history/:id
pub async fn delete_history_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.services.history.delete_session(&user, &id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
