//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use construtec_core::AdviceBackend;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ai_host: String,
    pub ai_model: String,
    pub ai_healthy: bool,
    pub history: &'static str,
    pub auth: &'static str,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client = state.services.advisor.client();
    let ai_healthy = client.health_check().await;

    Json(HealthResponse {
        status: if ai_healthy { "ok" } else { "degraded" },
        ai_host: client.host().to_string(),
        ai_model: client.model().to_string(),
        ai_healthy,
        history: state.services.history.name(),
        auth: state.services.auth.name(),
    })
}
