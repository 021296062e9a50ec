//! MCP (Model Context Protocol) server implementation.
//!
//! Implements the MCP JSON-RPC 2.0 protocol, exposing every registered
//! [`Adapter`] tool.  Supports the `initialize`, `ping`, `tools/list` and
//! `tools/call` methods plus batch arrays.  Notifications (requests without
//! an id, such as `notifications/initialized`) are accepted silently.
//!
//! Two transports share one [`McpServer`]: `POST /mcp` over HTTP, and
//! [`serve_stdio`], which reads one JSON-RPC message per line and writes one
//! response per line.
//!
//! The MCP specification version targeted is `2024-11-05`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use docgate_adapters::Adapter;

use crate::error::WebError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// MCP protocol version
// ---------------------------------------------------------------------------

/// The MCP protocol version this server implements.
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The server name reported during initialization.
const SERVER_NAME: &str = "docgate";

/// The server version reported during initialization.
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    /// Method parameters (defaults to `null` if absent).
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

// Standard JSON-RPC error codes.
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP-specific types
// ---------------------------------------------------------------------------

/// An MCP tool definition returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The result of an MCP `tools/call` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    pub content: Vec<McpContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// A single text content block within an MCP tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl McpContent {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: value.into(),
        }
    }
}

impl McpToolResult {
    /// Wrap a tool's JSON output.  Envelopes reporting `error` or
    /// `unhealthy` are flagged with `isError`.
    pub fn from_output(value: Value) -> Self {
        let failed = matches!(
            value.get("status").and_then(Value::as_str),
            Some("error" | "unhealthy")
        );
        let text = match value {
            Value::String(s) => s,
            other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        };
        Self {
            content: vec![McpContent::text(text)],
            is_error: failed.then_some(true),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::text(text)],
            is_error: Some(true),
        }
    }
}

// ---------------------------------------------------------------------------
// McpServer
// ---------------------------------------------------------------------------

/// MCP protocol server that exposes adapters as tools.
pub struct McpServer {
    adapters: Vec<Arc<dyn Adapter>>,
    /// Tool name to index into `adapters`.  The first adapter declaring a
    /// name owns it.
    owners: HashMap<String, usize>,
}

impl McpServer {
    /// Create a new MCP server backed by the given adapters.
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        let mut owners = HashMap::new();
        for (index, adapter) in adapters.iter().enumerate() {
            for tool in adapter.tools() {
                if owners.contains_key(&tool.name) {
                    warn!(tool = %tool.name, adapter = adapter.id(), "duplicate tool name ignored");
                    continue;
                }
                owners.insert(tool.name, index);
            }
        }
        Self { adapters, owners }
    }

    /// Handle one raw message (a single request or a batch array).
    ///
    /// Returns `None` when nothing must be sent back, i.e. the message held
    /// only notifications.
    pub async fn handle_message(&self, body: &str) -> Option<Value> {
        if let Ok(batch) = serde_json::from_str::<Vec<JsonRpcRequest>>(body) {
            if batch.is_empty() {
                return Some(json!(JsonRpcResponse::error(
                    None,
                    INVALID_REQUEST,
                    "empty batch request",
                )));
            }
            let mut responses = Vec::with_capacity(batch.len());
            for request in batch {
                if let Some(response) = self.respond(request).await {
                    responses.push(response);
                }
            }
            return (!responses.is_empty()).then(|| json!(responses));
        }

        match serde_json::from_str::<JsonRpcRequest>(body) {
            Ok(request) => self.respond(request).await.map(|r| json!(r)),
            Err(e) => Some(json!(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("failed to parse JSON-RPC request: {e}"),
            ))),
        }
    }

    /// Handle a request unless it is a notification.
    async fn respond(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.id.is_none() && request.method.starts_with("notifications/") {
            debug!(method = %request.method, "MCP notification received");
            return None;
        }
        Some(self.handle_request(request).await)
    }

    /// Handle a single JSON-RPC request and return a response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "MCP request received");

        match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            other => {
                warn!(method = %other, "unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                )
            }
        }
    }

    fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        match serde_json::to_value(self.list_tools()) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => {
                error!(error = %e, "failed to serialize tool list");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool list")
            }
        }
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `name` in params",
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let result = self.call_tool(name, arguments).await;
        match serde_json::to_value(&result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => {
                error!(error = %e, "failed to serialize tool result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool result")
            }
        }
    }

    /// Tool definitions of all adapters, in registration order.
    fn list_tools(&self) -> Vec<McpToolDefinition> {
        self.adapters
            .iter()
            .enumerate()
            .flat_map(|(index, adapter)| {
                adapter
                    .tools()
                    .into_iter()
                    .filter(move |t| self.owners.get(&t.name) == Some(&index))
            })
            .map(|t| McpToolDefinition {
                name: t.name,
                description: t.description,
                input_schema: t.parameters,
            })
            .collect()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpToolResult {
        let Some(adapter) = self.owners.get(name).map(|&i| &self.adapters[i]) else {
            return McpToolResult::error(format!("unknown tool: {name}"));
        };

        info!(tool = name, adapter = adapter.id(), "MCP tool call");
        match adapter.execute_tool(name, arguments).await {
            Ok(value) => McpToolResult::from_output(value),
            Err(e) => McpToolResult::error(format!("tool execution failed: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// `POST /mcp`: a single JSON-RPC request or a batch array.
pub async fn handle_mcp_request(State(state): State<Arc<AppState>>, body: String) -> Response {
    match state.mcp.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Serve MCP over line-delimited JSON until `reader` reaches end of input.
pub async fn serve_stdio<R, W>(server: &McpServer, reader: R, mut writer: W) -> Result<(), WebError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("MCP stdio transport started");
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.map_err(WebError::Stdio)? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(response) = server.handle_message(&line).await else {
            continue;
        };
        let mut out = response.to_string();
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .map_err(WebError::Stdio)?;
        writer.flush().await.map_err(WebError::Stdio)?;
    }
    info!("MCP stdio input closed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docgate_adapters::{AdapterError, HealthStatus, ToolDefinition};

    struct MockAdapter {
        id: String,
        tool_defs: Vec<ToolDefinition>,
    }

    #[async_trait]
    impl Adapter for MockAdapter {
        fn id(&self) -> &str {
            &self.id
        }

        async fn health_check(&self) -> docgate_adapters::Result<HealthStatus> {
            Ok(HealthStatus::Healthy)
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            self.tool_defs.clone()
        }

        async fn execute_tool(&self, name: &str, _params: Value) -> docgate_adapters::Result<Value> {
            match name {
                "mock_echo" => Ok(json!({"status": "success", "echo": "hello"})),
                "mock_error_envelope" => Ok(json!({"status": "error", "error": "no such thing"})),
                _ => Err(AdapterError::ToolNotFound {
                    adapter_id: self.id.clone(),
                    tool_name: name.to_owned(),
                }),
            }
        }
    }

    fn mock_tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_owned(),
            description: format!("{name} tool"),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    fn server() -> McpServer {
        McpServer::new(vec![
            Arc::new(MockAdapter {
                id: "mock1".into(),
                tool_defs: vec![mock_tool("mock_echo"), mock_tool("mock_error_envelope")],
            }),
            Arc::new(MockAdapter {
                id: "mock2".into(),
                tool_defs: vec![mock_tool("mock_echo"), mock_tool("mock_missing")],
            }),
        ])
    }

    fn request(id: Value, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let resp = server()
            .handle_request(request(json!(1), "initialize", json!({})))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "docgate");
    }

    #[tokio::test]
    async fn duplicate_tool_names_are_listed_once() {
        let resp = server()
            .handle_request(request(json!(2), "tools/list", Value::Null))
            .await;
        let result = resp.result.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["mock_echo", "mock_error_envelope", "mock_missing"]);
        assert!(result["tools"][0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn tool_call_outcomes() {
        let server = server();

        let ok = server
            .handle_request(request(json!(3), "tools/call", json!({"name": "mock_echo"})))
            .await
            .result
            .unwrap();
        assert!(ok.get("isError").is_none());
        assert!(ok["content"][0]["text"].as_str().unwrap().contains("hello"));

        let envelope_error = server
            .handle_request(request(
                json!(4),
                "tools/call",
                json!({"name": "mock_error_envelope", "arguments": {}}),
            ))
            .await
            .result
            .unwrap();
        assert_eq!(envelope_error["isError"], true);

        let failed = server
            .handle_request(request(json!(5), "tools/call", json!({"name": "mock_missing"})))
            .await
            .result
            .unwrap();
        assert_eq!(failed["isError"], true);
        assert!(
            failed["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("tool execution failed")
        );

        let unknown = server
            .handle_request(request(json!(6), "tools/call", json!({"name": "nope"})))
            .await
            .result
            .unwrap();
        assert!(unknown["content"][0]["text"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn protocol_errors() {
        let server = server();

        let resp = server
            .handle_request(request(json!(7), "tools/call", json!({"arguments": {}})))
            .await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let resp = server
            .handle_request(request(json!(8), "resources/list", Value::Null))
            .await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = server.handle_message("not json").await.unwrap();
        assert_eq!(resp["error"]["code"], PARSE_ERROR);

        let resp = server.handle_message("[]").await.unwrap();
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn batches_skip_notifications() {
        let body = r#"[
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            {"jsonrpc": "2.0", "id": 2, "method": "nonexistent"}
        ]"#;
        let resp = server().handle_message(body).await.unwrap();
        let responses = resp.as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);

        let only_notification = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        assert!(server().handle_message(only_notification).await.is_none());
    }

    #[tokio::test]
    async fn stdio_answers_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#,
            "\n",
            r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "mock_echo"}}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve_stdio(&server(), input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["id"], 2);
        assert!(lines[1]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("echo"));
    }
}
