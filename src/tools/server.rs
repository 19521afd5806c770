use crate::error::ProtocolError;
use crate::playback::PlaybackControl;
use crate::tools::{call_tool, tool_catalog};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "audio-player";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: &ProtocolError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code: error.code(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Line-delimited JSON-RPC 2.0 front end for the playback tools
pub struct ToolServer<'a, C> {
    controller: &'a C,
}

impl<'a, C: PlaybackControl> ToolServer<'a, C> {
    pub fn new(controller: &'a C) -> Self {
        Self { controller }
    }

    /// Serve requests from `reader` until EOF or until `shutdown` turns true,
    /// then stop playback.
    pub async fn run<R, W>(
        &self,
        reader: R,
        mut writer: W,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ProtocolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        info!("Tool server listening on stdio");

        let result = loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            info!("Input closed, shutting down tool server");
                            break Ok(());
                        }
                        Err(e) => break Err(ProtocolError::Transport(e)),
                    };

                    if let Some(response) = self.handle_message(&line).await {
                        if let Err(e) = write_line(&mut writer, &response).await {
                            break Err(ProtocolError::Transport(e));
                        }
                    }
                }
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Shutdown requested, stopping tool server");
                    break Ok(());
                }
            }
        };

        let outcome = self.controller.stop().await;
        debug!("Playback on server exit: {}", outcome.message());
        result
    }

    /// Handle one line of input; `None` when no response is due
    pub async fn handle_message(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => {
                warn!("Unparseable request: {}", e);
                JsonRpcResponse::failure(Value::Null, &ProtocolError::Parse(e))
            }
            Ok(value) => {
                let id = value.get("id").cloned();
                match serde_json::from_value::<JsonRpcRequest>(value) {
                    Err(e) => JsonRpcResponse::failure(
                        id.unwrap_or(Value::Null),
                        &ProtocolError::InvalidRequest(e.to_string()),
                    ),
                    Ok(request) => {
                        if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
                            debug!("Request declares jsonrpc {:?}", request.jsonrpc);
                        }
                        let Some(id) = request.id.clone() else {
                            debug!("Notification: {}", request.method);
                            return None;
                        };
                        match self.handle_request(&request).await {
                            Ok(result) => JsonRpcResponse::success(id, result),
                            Err(e) => {
                                warn!("Request '{}' failed: {}", request.method, e);
                                JsonRpcResponse::failure(id, &e)
                            }
                        }
                    }
                }
            }
        };

        match serde_json::to_string(&response) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                warn!("Failed to encode response: {}", e);
                None
            }
        }
    }

    async fn handle_request(&self, request: &JsonRpcRequest) -> Result<Value, ProtocolError> {
        debug!("Request: {}", request.method);
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_catalog() })),
            "tools/call" => {
                let params = request
                    .params
                    .clone()
                    .ok_or_else(|| ProtocolError::InvalidParams("missing params".to_string()))?;
                let params: CallToolParams = serde_json::from_value(params)
                    .map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;

                let result = call_tool(self.controller, &params.name, params.arguments).await;
                serde_json::to_value(result).map_err(ProtocolError::Parse)
            }
            other => Err(ProtocolError::MethodNotFound(other.to_string())),
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
