use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use droichead_n8n::N8nClient;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::dispatch;
use crate::protocol::{CapabilityAnnouncement, ServerInfo, ToolInvocation, ToolResult};
use crate::tools::ToolRegistry;

pub const SERVICE_NAME: &str = "droichead-mcp";

/// Heartbeat interval for idle streaming connections.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Shared, read-only-after-startup state: configuration, the tool registry,
/// the optional upstream client, and the live-session map.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ToolRegistry>,
    pub client: Option<Arc<N8nClient>>,
    sessions: RwLock<HashMap<Uuid, mpsc::UnboundedSender<ToolResult>>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let client = match (&config.upstream_url, &config.upstream_api_key) {
            (Some(url), Some(key)) => Some(Arc::new(
                N8nClient::new(url.clone(), key.clone())
                    .map_err(|e| anyhow::anyhow!("upstream client setup failed: {}", e))?,
            )),
            _ => None,
        };

        Ok(Arc::new(Self {
            config,
            registry: Arc::new(ToolRegistry::new()),
            client,
            sessions: RwLock::new(HashMap::new()),
        }))
    }

    // Poison-tolerant access: the lock is never held across an await, and a
    // panicked holder must not turn every later session operation into a
    // panic of its own.
    fn insert_session(&self, id: Uuid, tx: mpsc::UnboundedSender<ToolResult>) {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, tx);
    }

    fn remove_session(&self, id: &Uuid) {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(id);
    }

    fn session_sender(&self, id: &Uuid) -> Option<mpsc::UnboundedSender<ToolResult>> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Deregisters the session when the event stream is dropped, i.e. when the
/// caller disconnects or the connection faults. Results still in flight for
/// the session are then discarded at the send site.
struct SessionGuard {
    id: Uuid,
    state: Arc<AppState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.remove_session(&self.id);
        tracing::info!(session = %self.id, "streaming session closed");
    }
}

async fn sse_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !auth::authorized(&headers, &state.config.bearer_secret) {
        return unauthorized();
    }

    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    state.insert_session(id, tx);
    tracing::info!(session = %id, "streaming session opened");
    let guard = SessionGuard {
        id,
        state: state.clone(),
    };

    let announcement = CapabilityAnnouncement {
        server_info: ServerInfo {
            name: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        tools: state.registry.descriptors(),
    };

    let initial = stream::iter(vec![
        Event::default()
            .event("endpoint")
            .data(format!("/message?session={}", id)),
        Event::default()
            .event("capabilities")
            .data(encode(&announcement)),
    ]);

    let results = UnboundedReceiverStream::new(rx)
        .map(|result: ToolResult| Event::default().event("result").data(encode(&result)));

    let events = initial.chain(results).map(move |event| {
        let _session = &guard;
        Ok::<Event, Infallible>(event)
    });

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

#[derive(Debug, Deserialize)]
struct MessageParams {
    session: Uuid,
}

/// Invocation ingress for streaming sessions: accepted immediately, executed
/// in its own task, result delivered on the session's event stream.
async fn message_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessageParams>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !auth::authorized(&headers, &state.config.bearer_secret) {
        return unauthorized();
    }

    let mut invocation = match parse_invocation(body) {
        Ok(invocation) => invocation,
        Err(result) => return (StatusCode::OK, Json(*result)).into_response(),
    };

    let Some(tx) = state.session_sender(&params.session) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown session" })),
        )
            .into_response();
    };

    let id = invocation.correlation_id();
    let registry = state.registry.clone();
    let client = state.client.clone();
    tokio::spawn(async move {
        let result = dispatch::dispatch(registry, client, invocation).await;
        if tx.send(result).is_err() {
            tracing::debug!("session closed before delivery, dropping result");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "id": id })),
    )
        .into_response()
}

/// Synchronous invocation endpoint: one invocation in, one ToolResult out.
/// Tool-level failures are payload-level, the HTTP exchange itself succeeds.
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !auth::authorized(&headers, &state.config.bearer_secret) {
        return unauthorized();
    }

    let invocation = match parse_invocation(body) {
        Ok(invocation) => invocation,
        Err(result) => return Json(*result).into_response(),
    };

    let result = dispatch::dispatch(state.registry.clone(), state.client.clone(), invocation).await;
    Json(result).into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream_configured": state.config.upstream_configured(),
    }))
}

#[derive(Debug, Serialize)]
struct InfoResponse {
    name: &'static str,
    version: &'static str,
    tools: usize,
    upstream_configured: bool,
    custom_bearer: bool,
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        tools: state.registry.len(),
        upstream_configured: state.config.upstream_configured(),
        custom_bearer: state.config.custom_bearer(),
    })
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Turn a JSON body into an invocation, or into the validation_error result
/// the caller gets back instead.
fn parse_invocation(body: Value) -> Result<ToolInvocation, Box<ToolResult>> {
    let id = body.get("id").cloned().unwrap_or(Value::Null);
    let field = if !body.is_object() {
        "body"
    } else if !body.get("tool").map(Value::is_string).unwrap_or(false) {
        "tool"
    } else {
        "arguments"
    };

    serde_json::from_value::<ToolInvocation>(body).map_err(|e| {
        Box::new(ToolResult::validation_error(
            id,
            field,
            format!("malformed invocation body: {}", e),
        ))
    })
}
