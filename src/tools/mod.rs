pub mod server;

use crate::error::{ErrorKind, PlaybackError, ToolError};
use crate::models::{PlaybackState, PlayerStatus};
use crate::playback::PlaybackControl;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

/// A tool advertised through `tools/list`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The tools this server exposes, in listing order
pub fn tool_catalog() -> Vec<ToolDefinition> {
    let no_arguments = || json!({ "type": "object", "properties": {} });

    vec![
        ToolDefinition {
            name: "play",
            description: "Play an audio file, replacing anything currently playing",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "audioPath": {
                        "type": "string",
                        "description": "Path to the audio file"
                    }
                },
                "required": ["audioPath"]
            }),
        },
        ToolDefinition {
            name: "pause",
            description: "Pause the audio that is currently playing",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "resume",
            description: "Resume paused audio",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "stop",
            description: "Stop playback",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "get_status",
            description: "Get the current playback status",
            input_schema: no_arguments(),
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayArgs {
    pub audio_path: PathBuf,
}

/// Outcome of a control tool (`play`, `pause`, `resume`, `stop`)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
    pub status: PlayerStatus,
}

/// Result of `get_status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub state: PlaybackState,
    pub current_audio_path: Option<PathBuf>,
    pub position_ms: u64,
    pub is_playing: bool,
    pub is_paused: bool,
}

impl From<PlayerStatus> for StatusResponse {
    fn from(status: PlayerStatus) -> Self {
        Self {
            success: true,
            state: status.state,
            current_audio_path: status.current_audio_path,
            position_ms: status.position_ms,
            is_playing: status.is_playing,
            is_paused: status.is_paused,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Payload of a `tools/call` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    fn text(body: Value, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text",
                text: body.to_string(),
            }],
            is_error,
        }
    }

    /// The JSON object carried in the text content
    #[cfg(test)]
    pub fn body(&self) -> Option<Value> {
        self.content
            .first()
            .and_then(|content| serde_json::from_str(&content.text).ok())
    }
}

/// Invoke tool `name` against `controller`.
///
/// Playback failures are ordinary results with `success: false`; only an
/// unknown tool or undecodable arguments set `isError`.
pub async fn call_tool<C: PlaybackControl>(
    controller: &C,
    name: &str,
    arguments: Option<Value>,
) -> ToolCallResult {
    match dispatch(controller, name, arguments).await {
        Ok(body) => ToolCallResult::text(body, false),
        Err(e) => {
            log::warn!("Rejected tool call '{}': {}", name, e);
            ToolCallResult::text(
                json!({ "success": false, "error": e.to_string() }),
                true,
            )
        }
    }
}

async fn dispatch<C: PlaybackControl>(
    controller: &C,
    name: &str,
    arguments: Option<Value>,
) -> Result<Value, ToolError> {
    let response = match name {
        "play" => {
            let args: PlayArgs = decode_arguments(name, arguments)?;
            let result = controller.play(&args.audio_path).await;
            let message = format!("Playing: {}", args.audio_path.display());
            control_response(controller, result.map(|_| message), None).await
        }
        "pause" => {
            let result = controller.pause().await;
            let position_ms = match &result {
                Ok(position) => position.as_millis() as u64,
                Err(_) => controller.status().await.position_ms,
            };
            let result =
                result.map(|position| format!("Paused at ~{}ms", position.as_millis()));
            control_response(controller, result, Some(position_ms)).await
        }
        "resume" => {
            let result = controller.resume().await;
            let result = result.map(|_| "Resumed playback".to_string());
            control_response(controller, result, None).await
        }
        "stop" => {
            let outcome = controller.stop().await;
            control_response(controller, Ok(outcome.message().to_string()), None).await
        }
        "get_status" => {
            let status = StatusResponse::from(controller.status().await);
            return Ok(to_value(status));
        }
        other => return Err(ToolError::UnknownTool(other.to_string())),
    };

    Ok(to_value(response))
}

async fn control_response<C: PlaybackControl>(
    controller: &C,
    result: Result<String, PlaybackError>,
    position_ms: Option<u64>,
) -> ControlResponse {
    let status = controller.status().await;
    match result {
        Ok(message) => ControlResponse {
            success: true,
            message,
            error_kind: None,
            position_ms,
            status,
        },
        Err(e) => ControlResponse {
            success: false,
            message: e.to_string(),
            error_kind: Some(e.kind()),
            position_ms,
            status,
        },
    }
}

fn decode_arguments<T: for<'de> Deserialize<'de>>(
    tool: &str,
    arguments: Option<Value>,
) -> Result<T, ToolError> {
    let arguments = arguments.unwrap_or_else(|| json!({}));
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize>(response: T) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        json!({ "success": false, "message": format!("Failed to encode result: {}", e) })
    })
}
