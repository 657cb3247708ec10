//! MCP server over stdio
//!
//! Reads newline-delimited JSON-RPC messages, runs each request on its own
//! task, and writes responses as they complete. Logs never go to stdout.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::dispatcher::{definitions, Dispatcher};
use crate::error::ToolError;
use crate::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolResult, ToolsCapability, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};

pub const SERVER_NAME: &str = "handwriting-ocr";

#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Serve on the process's stdin/stdout until end of input or `shutdown` resolves.
    pub async fn run_stdio<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout, shutdown).await
    }

    /// Serve messages from `reader`, writing responses to `writer`.
    ///
    /// After shutdown or end of input no new requests are read; calls
    /// already in flight run to completion and their responses are written.
    pub async fn serve<R, W, S>(&self, reader: R, mut writer: W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        let mut in_flight: JoinSet<Option<String>> = JoinSet::new();
        tokio::pin!(shutdown);

        log::info!("Handwriting OCR MCP server running on stdio");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, closing transport");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        log::info!("Input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    log::debug!("Received message: {}", line);

                    let server = self.clone();
                    in_flight.spawn(async move { server.handle_message(&line).await });
                }
                Some(done) = in_flight.join_next() => {
                    Self::write_response(&mut writer, done).await?;
                }
            }
        }

        if !in_flight.is_empty() {
            log::info!("Waiting for {} in-flight call(s)", in_flight.len());
        }
        while let Some(done) = in_flight.join_next().await {
            Self::write_response(&mut writer, done).await?;
        }
        writer.flush().await?;

        Ok(())
    }

    async fn write_response<W>(
        writer: &mut W,
        done: std::result::Result<Option<String>, tokio::task::JoinError>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match done {
            Ok(Some(response)) => {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok(None) => {}
            Err(e) => log::error!("[MCP Error] request task failed: {}", e),
        }
        Ok(())
    }

    /// Handle a single raw message.
    ///
    /// Returns the serialized response, or `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(message) {
            Err(e) => Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            )),
            Ok(value) => match serde_json::from_value::<JsonRpcRequest>(value) {
                Err(e) => Some(JsonRpcResponse::error(
                    None,
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                )),
                Ok(request) if request.jsonrpc != "2.0" => Some(JsonRpcResponse::error(
                    request.id,
                    INVALID_REQUEST,
                    format!("Invalid Request: unsupported jsonrpc version {:?}", request.jsonrpc),
                )),
                Ok(request) => self.handle_request(request).await,
            },
        }?;

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("[MCP Error] failed to serialize response: {}", e);
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            log::debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, Self::initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };
        Some(response)
    }

    fn initialize_result() -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                )
            }
        };

        match self.dispatcher.call(&params.name, params.arguments).await {
            Ok(text) => match serde_json::to_value(ToolResult::text(text)) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            },
            Err(e) => JsonRpcResponse::error(id, error_code(&e), e.to_string()),
        }
    }
}

/// JSON-RPC error code for a failed tool call.
fn error_code(error: &ToolError) -> i32 {
    match error {
        ToolError::Argument(_) | ToolError::UnknownTool(_) => INVALID_PARAMS,
        ToolError::Configuration | ToolError::Upstream(_) | ToolError::Encode(_) => INTERNAL_ERROR,
    }
}
