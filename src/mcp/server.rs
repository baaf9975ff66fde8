//! MCP Server
//!
//! Main server loop handling line-delimited JSON-RPC messages. Protocol
//! traffic owns stdout; diagnostics go through `tracing` to stderr.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::handlers::ToolHandlers;
use super::protocol::*;
use crate::facade::Toolbox;

const PREVIEW_LEN: usize = 100;

/// MCP Server
pub struct McpServer {
    handlers: ToolHandlers,
}

impl McpServer {
    pub fn new(toolbox: Toolbox) -> Self {
        Self {
            handlers: ToolHandlers::new(toolbox),
        }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve one message per line until the reader is exhausted.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("MCP server started, waiting for messages");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(message = %preview(&line), "<-");

            let Some(response) = self.handle(&line).await else {
                continue;
            };
            let out = serde_json::to_string(&response)?;
            tracing::debug!(message = %preview(&out), "->");

            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        tracing::info!("MCP server shutting down");
        Ok(())
    }

    /// Handle a single JSON-RPC message; notifications produce no response.
    async fn handle(&self, msg: &str) -> Option<JsonRpcResponse> {
        let (id, method, params) = match Incoming::parse(msg) {
            Ok(Incoming::Call { id, method, params }) => (id, method, params),
            Ok(Incoming::Notification { method }) => {
                tracing::debug!(%method, "notification");
                return None;
            }
            Err(response) => return Some(response),
        };

        let response = match method {
            McpMethod::Initialize => JsonRpcResponse::success(
                id,
                InitializeResult::for_server("appmodel-mcp", env!("CARGO_PKG_VERSION")),
            ),
            McpMethod::Ping => JsonRpcResponse::success(id, Value::Object(Default::default())),
            McpMethod::ToolsList => JsonRpcResponse::success(
                id,
                ToolsListResult {
                    tools: self.handlers.tools(),
                },
            ),
            McpMethod::ToolsCall => match ToolCallParams::parse(params) {
                Ok(call) => {
                    tracing::info!(tool = %call.name, "calling tool");
                    let result = self
                        .handlers
                        .handle(&call.name, Value::Object(call.arguments))
                        .await;
                    JsonRpcResponse::success(id, result)
                }
                Err(error) => JsonRpcResponse::error(Some(id), error),
            },
            McpMethod::Unknown(method) => JsonRpcResponse::error(
                Some(id),
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Unknown method: {method}")),
            ),
        };
        Some(response)
    }
}

fn preview(line: &str) -> String {
    match line.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::catalog::Catalogs;
    use crate::facade::testing::ScriptedBridge;

    fn server() -> McpServer {
        let catalogs = Catalogs::builtin().unwrap();
        let toolbox = Toolbox::new(Arc::new(ScriptedBridge::default()), &catalogs).unwrap();
        McpServer::new(toolbox)
    }

    async fn exchange(input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        server().serve(input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_handshake_and_listing() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let responses = exchange(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], json!("2024-11-05"));
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], json!("appmodel-mcp"));
        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == json!("add_report_column")));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#,
            "\n"
        );
        let responses = exchange(input).await;
        assert_eq!(responses[0]["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(responses[1]["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(responses[2]["error"]["code"], json!(INVALID_PARAMS));
        assert_eq!(responses[2]["id"], json!(4));
    }

    #[tokio::test]
    async fn test_tool_failure_carries_error_code() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"add_report","arguments":{"owner_object_name":"Customer","report":{"name":"grid"}}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"list_reports","arguments":"all"}}"#,
            "\n"
        );
        let responses = exchange(input).await;
        let result = &responses[0]["result"];
        assert!(result.get("isError").is_none());
        let body: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error_code"], json!("VALIDATION_FAILED"));
        assert_eq!(body["violations"][0], json!("name: must match pattern ^[A-Z][A-Za-z0-9]*$"));
        assert_eq!(responses[1]["error"]["code"], json!(INVALID_PARAMS));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let line = "é".repeat(150);
        let cut = preview(&line);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_LEN + 3);
    }
}
