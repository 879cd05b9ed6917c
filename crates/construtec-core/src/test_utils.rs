//! Test utilities for construtec-core
//!
//! Mock Gemini and Supabase HTTP servers on ephemeral ports, for
//! integration tests and local development without real credentials.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// API key the mock Gemini server accepts
pub const MOCK_GEMINI_KEY: &str = "test-key";

/// Anon key the mock Supabase server accepts
pub const MOCK_SUPABASE_ANON_KEY: &str = "test-anon-key";

/// Serve `app` on 127.0.0.1 with an ephemeral port
async fn spawn(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

// ---------------------------------------------------------------------------
// Gemini

struct GeminiState {
    reply: Option<String>,
    status: StatusCode,
    delay: Option<Duration>,
    requests: Mutex<Vec<Value>>,
}

/// Mock Gemini `generateContent` server
pub struct MockGeminiServer {
    addr: SocketAddr,
    state: Arc<GeminiState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start a server that answers every request with `reply`
    pub async fn start(reply: &str) -> Self {
        Self::start_with(Some(reply.to_string()), StatusCode::OK, None).await
    }

    /// Start a server that returns a candidate with no text
    pub async fn start_empty() -> Self {
        Self::start_with(None, StatusCode::OK, None).await
    }

    /// Start a server that fails every generate call with `status`
    pub async fn start_failing(status: StatusCode) -> Self {
        Self::start_with(None, status, None).await
    }

    /// Start a server that waits `delay` before answering
    pub async fn start_slow(reply: &str, delay: Duration) -> Self {
        Self::start_with(Some(reply.to_string()), StatusCode::OK, Some(delay)).await
    }

    async fn start_with(reply: Option<String>, status: StatusCode, delay: Option<Duration>) -> Self {
        let state = Arc::new(GeminiState {
            reply,
            status,
            delay,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1beta/models/:model", get(handle_model).post(handle_generate))
            .with_state(state.clone());

        let (addr, shutdown_tx) = spawn(app).await;
        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bodies of every generate request received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_gemini_key(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        == Some(MOCK_GEMINI_KEY)
}

/// Model metadata endpoint (health check)
async fn handle_model(headers: HeaderMap) -> Response {
    if !has_gemini_key(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({"name": "models/gemini-2.5-flash"})).into_response()
}

/// `models/{model}:generateContent`
async fn handle_generate(
    State(state): State<Arc<GeminiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_gemini_key(&headers) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"message": "API key not valid"}})),
        )
            .into_response();
    }

    state.requests.lock().unwrap().push(body);

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    if !state.status.is_success() {
        return (
            state.status,
            Json(json!({"error": {"message": "mock failure"}})),
        )
            .into_response();
    }

    let parts = match &state.reply {
        Some(text) => json!([{"text": text}]),
        None => json!([]),
    };

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": parts},
            "groundingMetadata": {
                "groundingChunks": [
                    {"web": {"uri": "https://www.leroymerlin.pt", "title": "leroymerlin.pt"}},
                    {"retrievedContext": {"uri": "gs://interno"}}
                ]
            }
        }]
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Supabase

#[derive(Clone)]
struct MockUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct SupabaseData {
    users: Vec<MockUser>,
    /// access token -> user id
    tokens: HashMap<String, String>,
    sessions: Vec<Value>,
    messages: Vec<Value>,
    next_id: u64,
}

impl SupabaseData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Strictly increasing timestamps so ordering is deterministic
    fn timestamp(&self) -> String {
        let base: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        (base + chrono::Duration::seconds(self.next_id as i64)).to_rfc3339()
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = self.next_id("jwt");
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }
}

type SupabaseState = Arc<Mutex<SupabaseData>>;

/// Mock Supabase project (auth + PostgREST `sessions`/`messages`)
pub struct MockSupabaseServer {
    addr: SocketAddr,
    state: SupabaseState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockSupabaseServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state: SupabaseState = Arc::new(Mutex::new(SupabaseData::default()));

        let app = Router::new()
            .route("/auth/v1/signup", post(handle_signup))
            .route("/auth/v1/token", post(handle_token))
            .route("/auth/v1/logout", post(handle_logout))
            .route("/auth/v1/user", get(handle_user))
            .route(
                "/rest/v1/sessions",
                get(handle_list_sessions)
                    .post(handle_insert_session)
                    .delete(handle_delete_sessions),
            )
            .route(
                "/rest/v1/messages",
                get(handle_list_messages)
                    .post(handle_insert_message)
                    .delete(handle_delete_messages),
            )
            .with_state(state.clone());

        let (addr, shutdown_tx) = spawn(app).await;
        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of stored message rows
    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockSupabaseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_anon_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(MOCK_SUPABASE_ANON_KEY)
}

/// User id for the request's bearer token
fn bearer_user(data: &SupabaseData, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())?
        .strip_prefix("Bearer ")?;
    data.tokens.get(token).cloned()
}

fn auth_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error_description": message}))).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "JWT expired"}))).into_response()
}

/// Columns of the hosted tables; PostgREST rejects inserts naming any other
const SESSION_COLUMNS: &[&str] = &["id", "user_id", "title", "status", "created_at"];
const MESSAGE_COLUMNS: &[&str] = &["id", "session_id", "role", "content", "created_at"];

/// PGRST204-style rejection for the first unknown column in `body`
fn unknown_column(body: &Value, table: &str, columns: &[&str]) -> Option<Response> {
    let column = body
        .as_object()?
        .keys()
        .find(|key| !columns.contains(&key.as_str()))?;
    Some(
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "PGRST204",
                "message": format!("Could not find the '{}' column of '{}' in the schema cache", column, table)
            })),
        )
            .into_response(),
    )
}

/// PostgREST `eq.` filter value
fn eq_filter<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).and_then(|v| v.strip_prefix("eq."))
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn token_body(user: &MockUser, token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "user": {"id": user.id, "email": user.email}
    })
}

async fn handle_signup(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_anon_key(&headers) {
        return unauthorized();
    }
    let mut data = state.lock().unwrap();
    let email = str_field(&body, "email").to_string();
    let password = str_field(&body, "password").to_string();

    if data.users.iter().any(|u| u.email == email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"msg": "User already registered"})),
        )
            .into_response();
    }

    let user = MockUser {
        id: data.next_id("user"),
        email,
        password,
    };
    data.users.push(user.clone());
    let token = data.issue_token(&user.id);
    Json(token_body(&user, &token)).into_response()
}

async fn handle_token(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if !has_anon_key(&headers) {
        return unauthorized();
    }
    if query.get("grant_type").map(String::as_str) != Some("password") {
        return auth_error(StatusCode::BAD_REQUEST, "unsupported grant_type");
    }

    let mut data = state.lock().unwrap();
    let email = str_field(&body, "email");
    let password = str_field(&body, "password");
    let Some(user) = data
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned()
    else {
        return auth_error(StatusCode::BAD_REQUEST, "Invalid login credentials");
    };

    let token = data.issue_token(&user.id);
    Json(token_body(&user, &token)).into_response()
}

async fn handle_logout(State(state): State<SupabaseState>, headers: HeaderMap) -> Response {
    let mut data = state.lock().unwrap();
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    match token {
        Some(token) if data.tokens.remove(&token).is_some() => StatusCode::NO_CONTENT.into_response(),
        _ => unauthorized(),
    }
}

async fn handle_user(State(state): State<SupabaseState>, headers: HeaderMap) -> Response {
    let data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    match data.users.iter().find(|u| u.id == user_id) {
        Some(user) => Json(json!({"id": user.id, "email": user.email})).into_response(),
        None => unauthorized(),
    }
}

async fn handle_insert_session(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    if let Some(rejection) = unknown_column(&body, "sessions", SESSION_COLUMNS) {
        return rejection;
    }
    // Row-level security: users can only insert their own rows
    if str_field(&body, "user_id") != user_id {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "row-level security"}))).into_response();
    }

    let id = data.next_id("session");
    let row = json!({
        "id": id,
        "user_id": user_id,
        "title": body.get("title").cloned().unwrap_or(Value::Null),
        "status": body.get("status").cloned().unwrap_or(Value::Null),
        "created_at": data.timestamp(),
    });
    data.sessions.push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn handle_list_sessions(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };

    let mut rows: Vec<Value> = data
        .sessions
        .iter()
        .filter(|s| str_field(s, "user_id") == user_id)
        .filter(|s| eq_filter(&query, "user_id").map_or(true, |u| str_field(s, "user_id") == u))
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.reverse();
    }
    Json(rows).into_response()
}

async fn handle_delete_sessions(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    let id = eq_filter(&query, "id").unwrap_or_default().to_string();
    data.sessions
        .retain(|s| !(str_field(s, "id") == id && str_field(s, "user_id") == user_id));
    StatusCode::NO_CONTENT.into_response()
}

/// Whether `session_id` belongs to `user_id`
fn owns(data: &SupabaseData, user_id: &str, session_id: &str) -> bool {
    data.sessions
        .iter()
        .any(|s| str_field(s, "id") == session_id && str_field(s, "user_id") == user_id)
}

async fn handle_insert_message(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    if let Some(rejection) = unknown_column(&body, "messages", MESSAGE_COLUMNS) {
        return rejection;
    }
    let session_id = str_field(&body, "session_id").to_string();
    if !owns(&data, &user_id, &session_id) {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "row-level security"}))).into_response();
    }

    let id = data.next_id("message");
    let row = json!({
        "id": id,
        "session_id": session_id,
        "role": body.get("role").cloned().unwrap_or(Value::Null),
        "content": body.get("content").cloned().unwrap_or(Value::Null),
        "created_at": data.timestamp(),
    });
    data.messages.push(row);
    StatusCode::CREATED.into_response()
}

async fn handle_list_messages(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    let session_id = eq_filter(&query, "session_id").unwrap_or_default();
    if !owns(&data, &user_id, session_id) {
        // RLS hides rows rather than failing
        return Json(Vec::<Value>::new()).into_response();
    }

    let rows: Vec<Value> = data
        .messages
        .iter()
        .filter(|m| str_field(m, "session_id") == session_id)
        .cloned()
        .collect();
    Json(rows).into_response()
}

async fn handle_delete_messages(
    State(state): State<SupabaseState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut data = state.lock().unwrap();
    let Some(user_id) = bearer_user(&data, &headers) else {
        return unauthorized();
    };
    let session_id = eq_filter(&query, "session_id").unwrap_or_default().to_string();
    if owns(&data, &user_id, &session_id) {
        data.messages.retain(|m| str_field(m, "session_id") != session_id);
    }
    StatusCode::NO_CONTENT.into_response()
}
