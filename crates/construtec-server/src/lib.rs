//! Construtec Web Server
//!
//! REST API over the advisory pipeline: search, table view, history and
//! accounts under `/api`, plus an optional static front-end.
//!
//! Every `/api` route except sign-in, sign-up and health needs a bearer
//! token from the configured auth provider. `--no-auth` runs every request
//! as the fixed local user and is meant for local development only.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use construtec_core::auth::local_session;
use construtec_core::{AdviceBackend, Services};

mod error;
mod handlers;

pub use error::AppError;

#[derive(Clone)]
pub struct ServerConfig {
    /// Off only with `--no-auth`
    pub require_auth: bool,
    /// Cross-origin callers allowed to use the API; empty means same-origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: Vec::new(),
        }
    }
}

/// Immutable state shared by every handler
pub struct AppState {
    pub services: Services,
    pub config: ServerConfig,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Sent on every response
const SECURITY_HEADERS: [(HeaderName, &str); 3] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    // https images for supplier pages linked from result tables
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' https: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'",
    ),
];

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Puts the caller's `UserSession` into the request extensions
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = if state.config.require_auth {
        let Some(token) = bearer_token(request.headers()) else {
            warn!(path = %request.uri().path(), "Missing bearer token");
            return AppError::unauthorized("Authentication required").into_response();
        };
        match state.services.auth.current_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, path = %request.uri().path(), "Rejected bearer token");
                return AppError::from(e).into_response();
            }
        }
    } else {
        local_session()
    };

    debug!(user = %session.user_id, path = %request.uri().path(), "Request authorized");
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_router(services: Services, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let cors = cors_layer(&config.allowed_origins);
    let state = Arc::new(AppState { services, config });

    let public = Router::new()
        .route("/auth/signin", post(handlers::sign_in))
        .route("/auth/signup", post(handlers::sign_up))
        .route("/health", get(handlers::health));

    let protected = Router::new()
        .route("/auth/signout", post(handlers::sign_out))
        .route("/me", get(handlers::get_me))
        .route("/search", post(handlers::search))
        .route("/table", post(handlers::table_view))
        .route("/history", get(handlers::list_history))
        .route(
            "/history/:id",
            get(handlers::get_history_session).delete(handlers::delete_history_session),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut app = Router::new()
        .nest("/api", public.merge(protected))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app.layer(TraceLayer::new_for_http()).layer(cors);
    SECURITY_HEADERS.into_iter().fold(app, |app, (name, value)| {
        app.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

pub async fn serve(
    services: Services,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    log_ai_status(&services).await;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(auth = services.auth.name(), history = services.history.name(), "Listening on http://{}", addr);

    axum::serve(listener, create_router(services, static_dir, config)).await?;
    Ok(())
}

/// Searches still start without a key; they fail with a configuration hint
async fn log_ai_status(services: &Services) {
    let client = services.advisor.client();
    if client.health_check().await {
        info!(host = client.host(), model = client.model(), "✅ AI backend reachable");
    } else {
        warn!(
            host = client.host(),
            model = client.model(),
            "⚠️  AI backend not responding or GEMINI_API_KEY missing - searches will fail"
        );
    }
}
