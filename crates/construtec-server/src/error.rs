//! API error responses
//!
//! Every error leaves as `{"error": "<message>"}`. Core errors the caller can
//! act on keep their message; anything else is logged and replaced with a
//! generic one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use construtec_core::Error as CoreError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Logged, never sent
    cause: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            cause: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status and public message for core errors that are the caller's fault
fn client_error(err: &CoreError) -> Option<(StatusCode, String)> {
    match err {
        CoreError::Auth(msg) => Some((StatusCode::UNAUTHORIZED, msg.clone())),
        CoreError::NotFound(_) => Some((StatusCode::NOT_FOUND, "Not found".to_string())),
        CoreError::InvalidData(msg) => Some((StatusCode::BAD_REQUEST, msg.clone())),
        _ => None,
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err: anyhow::Error = err.into();
        if let Some((status, message)) = err.downcast_ref::<CoreError>().and_then(client_error) {
            return Self::new(status, message);
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred".to_string(),
            cause: Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(cause) = &self.cause {
            error!(error = %cause, "Request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}
