//! HTTP transport binding for the MCP dispatcher.
//!
//! Routes:
//! - `POST <endpoint>`: one JSON-RPC request in, one response out (202 and
//!   an empty body for notifications). JSON-RPC errors are sent with 200.
//! - `GET <endpoint>`: static server identity document.
//! - `DELETE <endpoint>`: close a session (session mode only).
//! - `GET /health`: liveness.
//!
//! The dispatcher is shared by both transport modes; a [`TransportBinding`]
//! only decides whether a request is admitted and which session it belongs
//! to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{ServerConfig, TransportMode};
use crate::handlers::{self, health, McpContext};
use crate::protocol::{
    self, ClientInfo, InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId,
};
use crate::schema::SchemaValidationError;
use crate::upstream::{ReaderClient, ReaderFetch};

/// Header carrying the session id in session mode.
pub const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// Last-resort body when a response cannot be serialized.
const INTERNAL_ERROR_BODY: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to compile argument schema: {0}")]
    Schema(#[from] SchemaValidationError),
    #[error("failed to build reader client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a request was refused before reaching the dispatcher.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub status: StatusCode,
    pub error: JsonRpcError,
}

/// Connection-lifecycle policy in front of the dispatcher.
#[async_trait]
pub trait TransportBinding: Send + Sync {
    fn mode(&self) -> TransportMode;

    /// Admit a decoded request, returning the session id to echo (if any).
    async fn admit(
        &self,
        headers: &HeaderMap,
        request: &JsonRpcRequest,
    ) -> Result<Option<String>, Rejection>;

    /// Handle `DELETE <endpoint>`.
    async fn terminate(&self, headers: &HeaderMap) -> StatusCode;
}

/// Every POST stands alone; nothing is remembered between requests.
#[derive(Debug, Default)]
pub struct StatelessBinding;

#[async_trait]
impl TransportBinding for StatelessBinding {
    fn mode(&self) -> TransportMode {
        TransportMode::Stateless
    }

    async fn admit(&self, _: &HeaderMap, _: &JsonRpcRequest) -> Result<Option<String>, Rejection> {
        Ok(None)
    }

    async fn terminate(&self, _: &HeaderMap) -> StatusCode {
        StatusCode::METHOD_NOT_ALLOWED
    }
}

/// Per-session context kept for the life of a session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub protocol_version: Option<String>,
    pub client: Option<ClientInfo>,
    pub opened_at: Instant,
    pub last_seen: Instant,
}

impl SessionInfo {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_seen) >= ttl
    }
}

/// `initialize` opens a session; later requests must present its id.
///
/// A session that sees no request for `ttl` is gone: it answers 404 like an
/// unknown id, and is dropped from the table on the next `initialize`.
#[derive(Debug)]
pub struct SessionBinding {
    sessions: RwLock<HashMap<String, SessionInfo>>,
    ttl: Duration,
}

impl SessionBinding {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn session(&self, id: &str) -> Option<SessionInfo> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn open(&self, request: &JsonRpcRequest) -> String {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        let id = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        let info = SessionInfo {
            protocol_version: params.protocol_version,
            client: params.client_info,
            opened_at: now,
            last_seen: now,
        };
        info!(
            session = %id,
            client = info.client.as_ref().and_then(|c| c.name.as_deref()).unwrap_or("unknown"),
            "Session opened"
        );

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        if sessions.len() < before {
            debug!(pruned = before - sessions.len(), "Dropped idle sessions");
        }
        sessions.insert(id.clone(), info);
        id
    }
}

fn session_not_found() -> Rejection {
    Rejection {
        status: StatusCode::NOT_FOUND,
        error: JsonRpcError::invalid_request_with("Session not found"),
    }
}

#[async_trait]
impl TransportBinding for SessionBinding {
    fn mode(&self) -> TransportMode {
        TransportMode::Session
    }

    async fn admit(
        &self,
        headers: &HeaderMap,
        request: &JsonRpcRequest,
    ) -> Result<Option<String>, Rejection> {
        let Some(id) = session_id(headers) else {
            if request.method == "initialize" && !request.is_notification() {
                return Ok(Some(self.open(request).await));
            }
            return Err(Rejection {
                status: StatusCode::BAD_REQUEST,
                error: JsonRpcError::invalid_request_with("Missing Mcp-Session-Id header"),
            });
        };

        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get_mut(id) {
            None => return Err(session_not_found()),
            Some(info) if info.is_expired(now, self.ttl) => true,
            Some(info) => {
                info.last_seen = now;
                false
            }
        };
        if expired {
            sessions.remove(id);
            info!(session = %id, "Session expired");
            return Err(session_not_found());
        }
        Ok(Some(id.to_string()))
    }

    async fn terminate(&self, headers: &HeaderMap) -> StatusCode {
        let Some(id) = session_id(headers) else {
            return StatusCode::BAD_REQUEST;
        };
        match self.sessions.write().await.remove(id) {
            Some(info) if !info.is_expired(Instant::now(), self.ttl) => {
                info!(session = %id, open_for = ?info.opened_at.elapsed(), "Session closed");
                StatusCode::NO_CONTENT
            }
            _ => StatusCode::NOT_FOUND,
        }
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(&SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<McpContext>,
    pub binding: Arc<dyn TransportBinding>,
}

impl AppState {
    pub fn new(ctx: Arc<McpContext>, mode: TransportMode, session_ttl: Duration) -> Self {
        let binding: Arc<dyn TransportBinding> = match mode {
            TransportMode::Stateless => Arc::new(StatelessBinding),
            TransportMode::Session => Arc::new(SessionBinding::new(session_ttl)),
        };
        Self { ctx, binding }
    }
}

/// MCP server bound to HTTP.
pub struct McpServer {
    config: ServerConfig,
    state: AppState,
}

impl McpServer {
    /// Build a server that talks to the configured reader.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let reader = ReaderClient::new(&config.reader)?;
        Self::with_reader(config, Arc::new(reader))
    }

    /// Build a server around any [`ReaderFetch`] implementation.
    pub fn with_reader(config: ServerConfig, reader: Arc<dyn ReaderFetch>) -> Result<Self, ServerError> {
        let ctx = Arc::new(McpContext::new(reader)?);
        let state = AppState::new(ctx, config.transport, config.session_ttl);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Create the axum Router.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                &self.config.endpoint_path,
                get(handle_identity).post(handle_post).delete(handle_delete),
            )
            .route("/health", get(handle_health))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            endpoint = %self.config.endpoint_path,
            transport = ?self.config.transport,
            reader = %self.config.reader.base_url,
            tools = self.state.ctx.registry.len(),
            "MCP server listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("MCP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn handle_identity() -> Json<health::ServerIdentity> {
    Json(health::identity())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(health::health())
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    state.binding.terminate(&headers).await
}

/// Handle `POST <endpoint>`.
///
/// The handler future owns the upstream fetch, so a client disconnect drops
/// it and cancels the outbound request.
async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            warn!(status = %rejection.status(), "Rejected request body");
            let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                JsonRpcError::invalid_request_with("Request body too large")
            } else {
                JsonRpcError::parse_error()
            };
            return json_response(
                rejection.status(),
                &JsonRpcResponse::error(RpcId::Null, error),
                None,
            );
        }
    };

    let request = match protocol::decode(&body) {
        Ok(r) => r,
        Err(resp) => return json_response(StatusCode::OK, &resp, None),
    };

    let session = match state.binding.admit(&headers, &request).await {
        Ok(session) => session,
        Err(rejection) => {
            debug!(method = %request.method, status = %rejection.status, "Request not admitted");
            return json_response(
                rejection.status,
                &JsonRpcResponse::error(request.response_id(), rejection.error),
                None,
            );
        }
    };

    debug!(
        method = %request.method,
        id = %request.response_id(),
        session = session.as_deref().unwrap_or("-"),
        "MCP request"
    );

    match handlers::dispatch_guarded(&request, &state.ctx).await {
        Some(resp) => json_response(StatusCode::OK, &resp, session.as_deref()),
        None => {
            let mut response = StatusCode::ACCEPTED.into_response();
            attach_session(&mut response, session.as_deref());
            response
        }
    }
}

fn json_response(status: StatusCode, resp: &JsonRpcResponse, session: Option<&str>) -> Response {
    let (status, body) = match serde_json::to_vec(resp) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from_static(INTERNAL_ERROR_BODY))
        }
    };
    let mut response = (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
    attach_session(&mut response, session);
    response
}

fn attach_session(response: &mut Response, session: Option<&str>) {
    if let Some(value) = session.and_then(|s| HeaderValue::from_str(s).ok()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    fn initialize() -> JsonRpcRequest {
        JsonRpcRequest::new(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": "2025-03-26",
                "clientInfo": { "name": "agent", "version": "1.0" }
            })),
        )
    }

    fn with_session(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    async fn open(binding: &SessionBinding) -> String {
        binding
            .admit(&HeaderMap::new(), &initialize())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn initialize_records_client_details() {
        let binding = SessionBinding::new(TTL);
        assert!(binding.is_empty().await);

        let id = open(&binding).await;
        assert_eq!(binding.len().await, 1);

        let info = binding.session(&id).await.unwrap();
        assert_eq!(info.protocol_version.as_deref(), Some("2025-03-26"));
        assert_eq!(info.client.and_then(|c| c.name).as_deref(), Some("agent"));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_keeps_a_session_alive() {
        let binding = SessionBinding::new(TTL);
        let id = open(&binding).await;
        let ping = JsonRpcRequest::new(2, "ping", None);

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(45)).await;
            assert_eq!(binding.admit(&with_session(&id), &ping).await.unwrap(), Some(id.clone()));
        }
        let info = binding.session(&id).await.unwrap();
        assert_eq!(info.last_seen.duration_since(info.opened_at), Duration::from_secs(135));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_expires_and_is_removed() {
        let binding = SessionBinding::new(TTL);
        let id = open(&binding).await;

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let rejection = binding
            .admit(&with_session(&id), &JsonRpcRequest::new(2, "tools/list", None))
            .await
            .unwrap_err();
        assert_eq!(rejection.status, StatusCode::NOT_FOUND);
        assert!(binding.session(&id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn opening_a_session_prunes_idle_ones() {
        let binding = SessionBinding::new(TTL);
        let stale_a = open(&binding).await;
        let stale_b = open(&binding).await;
        assert_eq!(binding.len().await, 2);

        tokio::time::advance(TTL).await;
        let fresh = open(&binding).await;

        assert_eq!(binding.len().await, 1);
        assert!(binding.session(&stale_a).await.is_none());
        assert!(binding.session(&stale_b).await.is_none());
        assert!(binding.session(&fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_cannot_be_deleted() {
        let binding = SessionBinding::new(TTL);
        let id = open(&binding).await;
        tokio::time::advance(TTL * 2).await;
        assert_eq!(binding.terminate(&with_session(&id)).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn app_state_picks_binding_for_mode() {
        let reader = ReaderClient::new(&ReaderConfig::default()).unwrap();
        let ctx = Arc::new(McpContext::new(Arc::new(reader)).unwrap());

        for mode in [TransportMode::Stateless, TransportMode::Session] {
            let state = AppState::new(ctx.clone(), mode, TTL);
            assert_eq!(state.binding.mode(), mode);
        }
        assert_eq!(StatelessBinding.terminate(&HeaderMap::new()).await, StatusCode::METHOD_NOT_ALLOWED);
    }
}
