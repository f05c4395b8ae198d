//! MCP Server
//!
//! JSON-RPC message handling plus the stdio loop. Stdout carries protocol
//! frames only; everything else goes through `tracing` to stderr.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::handlers::ToolHandlers;
use super::protocol::*;
use super::tools::get_tools;

const PREVIEW_CHARS: usize = 100;

pub struct McpServer {
    handlers: ToolHandlers,
}

impl McpServer {
    pub fn new(handlers: ToolHandlers) -> Self {
        Self { handlers }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!("MCP server started, waiting for messages");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!("<- {}", preview(&line));

            let Some(response) = self.handle_message(&line).await else {
                continue;
            };
            let out = serde_json::to_string(&response)?;
            tracing::debug!("-> {}", preview(&out));

            stdout.write_all(out.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        tracing::info!("stdin closed, MCP server shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC message; notifications produce no response
    pub async fn handle_message(&self, msg: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(msg) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    None,
                    ErrorCode::ParseError,
                    e.to_string(),
                ))
            }
        };

        if req.is_notification() {
            tracing::debug!(method = %req.method, "notification");
            return None;
        }
        if req.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                req.id,
                ErrorCode::InvalidRequest,
                format!("Unsupported jsonrpc version: {}", req.jsonrpc),
            ));
        }

        let id = req.id.clone();
        let response = match Method::parse(&req.method) {
            Method::Initialize => JsonRpcResponse::from_result(id, &InitializeResult::current()),
            Method::Initialized => JsonRpcResponse::success(id, Value::Null),
            Method::Ping => JsonRpcResponse::success(id, json!({})),
            Method::ToolsList => {
                JsonRpcResponse::from_result(id, &ToolsListResult { tools: get_tools() })
            }
            Method::ToolsCall => {
                let params: ToolCallParams = match serde_json::from_value(req.params) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(JsonRpcResponse::failure(
                            id,
                            ErrorCode::InvalidParams,
                            e.to_string(),
                        ))
                    }
                };
                tracing::info!(tool = %params.name, "calling tool");
                let result = self.handlers.handle(&params.name, params.arguments).await;
                JsonRpcResponse::from_result(id, &result)
            }
            Method::Unknown(name) => JsonRpcResponse::failure(
                id,
                ErrorCode::MethodNotFound,
                format!("Unknown method: {}", name),
            ),
        };
        Some(response)
    }
}

fn preview(line: &str) -> String {
    if line.chars().count() > PREVIEW_CHARS {
        let head: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}
