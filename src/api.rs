use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::command::{CommandResult, SessionId};
use crate::error::{CommandError, ErrorKind};
use crate::state::ServerState;
use crate::tools::{self, ToolCallResult};
use crate::value;

pub const SERVER_NAME: &str = "godot_mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

fn ok_json<T: Serialize>(data: T) -> impl IntoResponse {
    Json(ApiOk { ok: true, data })
}

fn err_json(status: StatusCode, msg: String) -> impl IntoResponse {
    (
        status,
        Json(ApiErr {
            ok: false,
            error: msg,
            kind: None,
            correlation_id: None,
        }),
    )
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownCommand => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::HostOperationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::HostUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SessionClosed => StatusCode::GONE,
    }
}

fn command_err(e: &CommandError, correlation_id: Option<String>) -> axum::response::Response {
    (
        status_for(e.kind),
        Json(ApiErr {
            ok: false,
            error: e.message.clone(),
            kind: Some(e.kind),
            correlation_id,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct ToolResponse {
    correlation_id: String,
    result: Value,
}

fn tool_response(result: CommandResult) -> axum::response::Response {
    let correlation_id = result.correlation_id.to_string();
    match result.outcome {
        Ok(payload) => ok_json(ToolResponse {
            correlation_id,
            result: value::to_wire(&payload),
        })
        .into_response(),
        Err(e) => command_err(&e, Some(correlation_id)),
    }
}

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    #[serde(default)]
    session: Option<String>,
}

impl SessionQuery {
    fn session_id(&self) -> SessionId {
        self.session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(SessionId::default_session, SessionId::new)
    }
}

// ── REST handlers ────────────────────────────────────────────────

async fn get_tools(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    ok_json(state.catalog.to_json())
}

async fn post_tool(
    Extension(state): Extension<Arc<ServerState>>,
    Path(name): Path<String>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let arguments = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(_) => {
                return err_json(
                    StatusCode::BAD_REQUEST,
                    "Tool arguments must be a JSON object".to_string(),
                )
                .into_response()
            }
            Err(e) => {
                return err_json(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
                    .into_response()
            }
        }
    };
    let correlation = match headers.get(CORRELATION_HEADER).map(|v| v.to_str()) {
        None => None,
        Some(Ok(raw)) => Some(raw),
        Some(Err(_)) => {
            return err_json(
                StatusCode::BAD_REQUEST,
                format!("{CORRELATION_HEADER} must be ASCII"),
            )
            .into_response()
        }
    };
    let result =
        tools::call_tool(&state, &name, query.session_id(), correlation, &arguments).await;
    tool_response(result)
}

async fn post_session(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let id = state.sessions().open();
    ok_json(json!({ "session_id": id }))
}

async fn delete_session(
    Extension(state): Extension<Arc<ServerState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = SessionId::new(id);
    match state.bridge.close_session(&id) {
        Ok(pending) => ok_json(json!({ "session_id": id, "failed_pending": pending })).into_response(),
        Err(e) => command_err(&e, None),
    }
}

async fn get_status(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    ok_json(json!({
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "active": !state.bridge.is_shut_down(),
        "project_dir": state.project_dir,
        "started_at": state.started_at,
        "port": state.port(),
        "session_count": state.sessions().len(),
        "sessions": state.sessions().snapshot(),
        "queued": state.bridge.queued(),
        "in_flight": state.bridge.in_flight(),
        "tool_count": state.catalog.len(),
    }))
}

// ── JSON-RPC ─────────────────────────────────────────────────────

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
    })
}

/// Handle one decoded JSON-RPC message. `None` means it was a notification
/// and gets no reply.
async fn handle_rpc(state: &ServerState, session: SessionId, msg: &Value) -> Option<Value> {
    let Some(request) = msg.as_object() else {
        return Some(rpc_error(Value::Null, INVALID_REQUEST, "Invalid Request"));
    };
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let id = request.get("id").cloned()?;
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    let response = match method {
        "initialize" => rpc_result(id, initialize_result()),
        "ping" => rpc_result(id, json!({})),
        "tools/list" => rpc_result(id, json!({ "tools": state.catalog.to_json() })),
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(rpc_error(id, INVALID_PARAMS, "Missing tool name"));
            };
            let arguments = match params.get("arguments") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(_) => {
                    return Some(rpc_error(id, INVALID_PARAMS, "Tool arguments must be an object"))
                }
            };
            let correlation = params
                .get("_meta")
                .and_then(|meta| meta.get("correlationId"))
                .and_then(Value::as_str);
            let result = tools::call_tool(state, name, session, correlation, &arguments).await;
            let wire = serde_json::to_value(ToolCallResult::from(result)).unwrap_or(Value::Null);
            rpc_result(id, wire)
        }
        _ => rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };
    Some(response)
}

async fn post_mcp(
    Extension(state): Extension<Arc<ServerState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> impl IntoResponse {
    let msg: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return Json(rpc_error(Value::Null, PARSE_ERROR, "Parse error")).into_response(),
    };
    match handle_rpc(&state, query.session_id(), &msg).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/tools/{name}", post(post_tool))
        .route("/api/tools", get(get_tools))
        .route("/api/sessions", post(post_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/status", get(get_status))
        .route("/mcp", post(post_mcp))
        .layer(cors)
        .layer(Extension(state))
}

/// Bind the HTTP surface and serve it in the background. Returns the bound
/// port (useful when `addr` asks for port 0) and the server task.
pub async fn start_api_server(
    state: Arc<ServerState>,
    addr: SocketAddr,
) -> Result<(u16, JoinHandle<()>), String> {
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;
    let port = listener
        .local_addr()
        .map_err(|e| format!("Failed to get API server port: {e}"))?
        .port();
    state.set_port(port);
    info!(%addr, port, "API server listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server error");
        }
    });

    Ok((port, handle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bridge::DispatchBridge;
    use crate::host::{HeadlessHost, Host, ResPath};
    use crate::registry::{Catalog, HandlerRegistry};
    use crate::runtime::HostLoop;
    use crate::session::SessionTable;
    use crate::settings::BridgeSettings;

    struct TestServer {
        _dir: tempfile::TempDir,
        state: Arc<ServerState>,
        base: String,
        host: Option<std::thread::JoinHandle<HeadlessHost>>,
    }

    impl TestServer {
        async fn start() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut host = HeadlessHost::open(dir.path()).unwrap();
            host.new_scene(&ResPath::parse("res://main.tscn").unwrap(), "Node2D")
                .unwrap();
            let catalog = Arc::new(Catalog::new());
            let (bridge, pump) = DispatchBridge::new(Arc::new(SessionTable::new()));
            let registry = HandlerRegistry::new(Arc::clone(&catalog));
            let handle = HostLoop::new(host, registry, pump, Duration::from_millis(1))
                .spawn()
                .unwrap();
            let state = Arc::new(ServerState::new(
                catalog,
                bridge,
                BridgeSettings::default(),
                dir.path().to_path_buf(),
            ));
            let (port, _task) = start_api_server(
                Arc::clone(&state),
                SocketAddr::from(([127, 0, 0, 1], 0)),
            )
            .await
            .unwrap();
            Self {
                _dir: dir,
                state,
                base: format!("http://127.0.0.1:{port}"),
                host: Some(handle),
            }
        }

        async fn stop(mut self) {
            self.state.bridge.shutdown();
            if let Some(handle) = self.host.take() {
                tokio::task::spawn_blocking(move || handle.join().unwrap())
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn rest_tool_calls_use_envelopes() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();

        let tools: Value = client
            .get(format!("{}/api/tools", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(tools["ok"], json!(true));
        assert_eq!(tools["data"].as_array().unwrap().len(), 21);

        let created = client
            .post(format!("{}/api/tools/create_node", server.base))
            .header(CORRELATION_HEADER, "abc-1")
            .json(&json!({ "type": "Sprite2D", "name": "Foo" }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        let created: Value = created.json().await.unwrap();
        assert_eq!(created["data"]["correlation_id"], json!("abc-1"));
        assert_eq!(created["data"]["result"]["path"], json!("/root/Foo"));

        let missing = client
            .post(format!("{}/api/tools/create_node", server.base))
            .json(&json!({ "name": "NoType" }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let missing: Value = missing.json().await.unwrap();
        assert_eq!(missing["ok"], json!(false));
        assert_eq!(missing["kind"], json!("InvalidArgument"));

        server.stop().await;
    }

    #[tokio::test]
    async fn sessions_open_close_and_show_in_status() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();

        let opened: Value = client
            .post(format!("{}/api/sessions", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = opened["data"]["session_id"].as_str().unwrap().to_string();

        let status: Value = client
            .get(format!("{}/api/status", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["data"]["session_count"], json!(2));
        assert_eq!(status["data"]["active"], json!(true));

        let called = client
            .post(format!("{}/api/tools/get_editor_state?session={id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(called.status(), StatusCode::OK);

        let closed = client
            .delete(format!("{}/api/sessions/{id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(closed.status(), StatusCode::OK);

        let after = client
            .post(format!("{}/api/tools/get_editor_state?session={id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::GONE);

        server.stop().await;
    }

    #[tokio::test]
    async fn json_rpc_surface() {
        let server = TestServer::start().await;
        let client = reqwest::Client::new();
        let url = format!("{}/mcp", server.base);

        let init: Value = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(init["result"]["serverInfo"]["name"], json!("godot_mcp"));

        let notified = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .send()
            .await
            .unwrap();
        assert_eq!(notified.status(), StatusCode::ACCEPTED);

        let listed: Value = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed["result"]["tools"].as_array().unwrap().len(), 21);

        let called: Value = client
            .post(&url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": { "name": "get_editor_state", "arguments": {} }
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(called["result"]["isError"], json!(false));
        assert_eq!(called["result"]["structuredContent"]["scene_open"], json!(true));

        let failed: Value = client
            .post(&url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": { "name": "open_scene", "arguments": { "path": "res://nope.tscn" } }
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(failed["result"]["isError"], json!(true));
        let text = failed["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("InvalidArgument: "));

        let unknown: Value = client
            .post(&url)
            .json(&json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(unknown["error"]["code"], json!(METHOD_NOT_FOUND));

        let garbled: Value = client
            .post(&url)
            .body("{ not json")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(garbled["error"]["code"], json!(PARSE_ERROR));

        server.stop().await;
    }
}
