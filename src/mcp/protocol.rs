//! JSON-RPC 2.0 framing for the tool server.
//!
//! Incoming lines are classified into calls and notifications here, tool
//! parameters are decoded into typed values, and tool outcomes are rendered
//! into MCP content blocks. The server loop only routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// One line as read off the wire.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Methods the server answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
    Unknown(String),
}

impl McpMethod {
    pub fn parse(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A decoded message: either a call that needs exactly one response, or a
/// notification that gets none.
#[derive(Debug)]
pub enum Incoming {
    Call {
        id: Value,
        method: McpMethod,
        params: Value,
    },
    Notification { method: String },
}

impl Incoming {
    /// Decode one line. Failures come back as the response to send.
    pub fn parse(line: &str) -> Result<Self, JsonRpcResponse> {
        let request: JsonRpcRequest = serde_json::from_str(line)
            .map_err(|e| JsonRpcResponse::error(None, JsonRpcError::new(PARSE_ERROR, e.to_string())))?;

        if request.jsonrpc != "2.0" {
            return Err(JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Unsupported jsonrpc version: {}", request.jsonrpc),
                ),
            ));
        }
        Ok(match request.id {
            None | Some(Value::Null) => Incoming::Notification {
                method: request.method,
            },
            Some(id) => Incoming::Call {
                id,
                method: McpMethod::parse(&request.method),
                params: request.params,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl JsonRpcResponse {
    /// Serialize `result` into a success response, or an internal error if
    /// it cannot be serialized.
    pub fn success(id: Value, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: "2.0".into(),
                id: Some(id),
                result: Some(result),
                error: None,
            },
            Err(e) => Self::error(
                Some(id),
                JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {e}")),
            ),
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

impl InitializeResult {
    /// Tools only; the tool list is fixed for the life of the process.
    pub fn for_server(name: &str, version: &str) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
}

/// `tools/call` parameters. Absent or null arguments decode as an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl ToolCallParams {
    pub fn parse(params: Value) -> Result<Self, JsonRpcError> {
        let raw: RawToolCall = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, e.to_string()))?;
        let arguments = match raw.arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                return Err(JsonRpcError::new(
                    INVALID_PARAMS,
                    format!("arguments for {} must be an object", raw.name),
                ))
            }
        };
        Ok(Self {
            name: raw.name,
            arguments,
        })
    }
}

/// Tool call result
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolContent {
    fn text(text: String) -> Self {
        Self {
            content_type: "text".into(),
            text,
        }
    }
}

impl ToolCallResult {
    pub fn json(value: &Value) -> Self {
        Self {
            content: vec![ToolContent::text(
                serde_json::to_string_pretty(value).unwrap_or_default(),
            )],
            is_error: None,
        }
    }

    /// A failure the tool itself reported. The call succeeded, so the body
    /// is the structured `{success: false, error, error_code}` record.
    pub fn failure(err: &ToolError) -> Self {
        Self::json(&err.to_failure())
    }

    /// The call could not be made at all (unknown tool, bad arguments).
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(msg.into())],
            is_error: Some(true),
        }
    }
}
