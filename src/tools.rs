//! Transport-agnostic tool surface: list the catalog, call a tool by name.
//! The HTTP and JSON-RPC layers and the CLI all go through here.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::command::{Arguments, Command, CommandResult, CorrelationId, SessionId};
use crate::error::CommandError;
use crate::registry::{Catalog, ToolDescriptor};
use crate::state::ServerState;
use crate::value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ContentBlock {
    fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

/// Wire shape of a tool call outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn failure(error: &CommandError) -> Self {
        Self {
            content: vec![ContentBlock::text(error.to_string())],
            structured_content: None,
            is_error: true,
        }
    }

    /// Object payloads pass through; anything else is wrapped as
    /// `{"result": ...}`.
    pub fn success(payload: Value) -> Self {
        let structured = match payload {
            Value::Object(_) => payload,
            other => json!({ "result": other }),
        };
        let text = serde_json::to_string_pretty(&structured).unwrap_or_default();
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: Some(structured),
            is_error: false,
        }
    }
}

impl From<CommandResult> for ToolCallResult {
    fn from(result: CommandResult) -> Self {
        match result.outcome {
            Ok(payload) => Self::success(value::to_wire(&payload)),
            Err(e) => Self::failure(&e),
        }
    }
}

pub fn list_tools(catalog: &Catalog) -> Vec<&ToolDescriptor> {
    catalog.list().collect()
}

/// Coerce `arguments` against the tool's input shape, submit, and wait.
/// Unknown names still go through the bridge so the failure comes back as
/// an `UnknownCommand` result like any other.
pub async fn call_tool(
    state: &ServerState,
    name: &str,
    session: SessionId,
    correlation: Option<&str>,
    arguments: &Map<String, Value>,
) -> CommandResult {
    let correlation = match correlation.map(CorrelationId::parse).transpose() {
        Ok(cid) => cid.unwrap_or_default(),
        Err(e) => return CommandResult::failure(CorrelationId::default(), e.into()),
    };
    let shape = state.catalog.get(name).map(|tool| &tool.input_shape);
    let args = Arguments::from_wire(arguments, shape, state.settings.null_policy);
    let command = Command::new(name, args)
        .with_session(session)
        .with_correlation(correlation);
    debug!(tool = name, "tool call");
    state
        .bridge
        .submit(command, state.settings.call_timeout())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::bridge::DispatchBridge;
    use crate::error::ErrorKind;
    use crate::host::{HeadlessHost, Host, ResPath};
    use crate::registry::HandlerRegistry;
    use crate::runtime::HostLoop;
    use crate::session::SessionTable;
    use crate::settings::BridgeSettings;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn server() -> (tempfile::TempDir, Arc<ServerState>, std::thread::JoinHandle<HeadlessHost>) {
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
        let state = ServerState::new(
            catalog,
            bridge,
            BridgeSettings::default(),
            dir.path().to_path_buf(),
        );
        (dir, Arc::new(state), handle)
    }

    #[test]
    fn list_tools_declares_required_type_for_create_node() {
        let catalog = Catalog::new();
        let tools = list_tools(&catalog);
        assert_eq!(tools.len(), 21);
        let create = tools.iter().find(|t| t.name == "create_node").unwrap();
        assert!(create.required().contains(&"type"));
    }

    #[test]
    fn non_object_payloads_are_wrapped() {
        let result = ToolCallResult::success(json!(42));
        assert_eq!(result.structured_content, Some(json!({ "result": 42 })));
        assert!(!result.is_error);
    }

    #[test]
    fn failures_render_kind_and_message() {
        let result = ToolCallResult::failure(&CommandError::unknown_command("fly"));
        assert!(result.is_error);
        assert_eq!(result.content[0].text, "UnknownCommand: Unknown command: fly");
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["isError"], json!(true));
        assert!(wire.get("structuredContent").is_none());
    }

    #[tokio::test]
    async fn call_tool_runs_through_the_host_loop() {
        let (_dir, state, handle) = server();

        let created = call_tool(
            &state,
            "create_node",
            SessionId::default_session(),
            Some("req-7"),
            &object(json!({ "type": "Node2D", "name": "Foo" })),
        )
        .await;
        assert_eq!(created.correlation_id.as_str(), "req-7");
        let wire = ToolCallResult::from(created);
        assert_eq!(
            wire.structured_content.as_ref().unwrap()["path"],
            json!("/root/Foo")
        );

        let missing = call_tool(
            &state,
            "update_node_property",
            SessionId::default_session(),
            None,
            &object(json!({ "path": "/root/Missing", "property": "visible", "value": false })),
        )
        .await;
        assert_eq!(missing.error_kind(), Some(ErrorKind::HostOperationFailed));

        let unknown = call_tool(&state, "fly", SessionId::default_session(), None, &Map::new()).await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::UnknownCommand));

        state.bridge.shutdown();
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bad_correlation_header_is_invalid() {
        let (_dir, state, handle) = server();
        let result = call_tool(
            &state,
            "get_editor_state",
            SessionId::default_session(),
            Some("has space"),
            &Map::new(),
        )
        .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
        state.bridge.shutdown();
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
    }
}
