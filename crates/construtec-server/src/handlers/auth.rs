//! Authentication handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use construtec_core::auth::CONFIRM_EMAIL_MESSAGE;
use construtec_core::{SignUpOutcome, UserSession};

/// Request body for sign-in and sign-up
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Response for the /api/auth/signup endpoint
#[derive(Serialize)]
pub struct SignUpResponse {
    /// Present when the account is usable right away
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<UserSession>,
    /// Present when the email still needs confirming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    /// Which provider authenticated the user ("none" with auth disabled)
    pub auth_method: String,
}

fn validate(req: &CredentialsRequest) -> Result<(), AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email e palavra-passe são obrigatórios."));
    }
    Ok(())
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<UserSession>, AppError> {
    validate(&req)?;
    let session = state
        .services
        .auth
        .sign_in(req.email.trim(), &req.password)
        .await?;
    Ok(Json(session))
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SignUpResponse>, AppError> {
    validate(&req)?;
    let outcome = state
        .services
        .auth
        .sign_up(req.email.trim(), &req.password)
        .await?;

    let response = match outcome {
        SignUpOutcome::SignedIn(session) => SignUpResponse {
            session: Some(session),
            message: None,
        },
        SignUpOutcome::ConfirmationRequired { email } => {
            info!(email = %email, "Sign-up awaiting email confirmation");
            SignUpResponse {
                session: None,
                message: Some(CONFIRM_EMAIL_MESSAGE.to_string()),
            }
        }
    };
    Ok(Json(response))
}

/// POST /api/auth/signout
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.config.require_auth {
        state.services.auth.sign_out(&user).await?;
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserSession>,
) -> Json<MeResponse> {
    let auth_method = if state.config.require_auth {
        state.services.auth.name()
    } else {
        "none"
    };

    Json(MeResponse {
        user_id: user.user_id,
        email: user.email,
        auth_method: auth_method.to_string(),
    })
}
