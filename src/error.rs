use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Playback(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::Protocol(err) => err.to_string(),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Playback(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
            _ => Vec::new(),
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Playback(PlaybackError::InvalidState { .. }) => ErrorSeverity::Info,
            PlayerError::Playback(PlaybackError::Unsupported { .. }) => ErrorSeverity::Warning,
            PlayerError::Playback(PlaybackError::NotFound { .. }) => ErrorSeverity::Warning,
            PlayerError::Playback(_) => ErrorSeverity::Error,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::Protocol(_) => ErrorSeverity::Error,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
        }
    }
}

/// Failures of the playback controller.
///
/// Every variant is recoverable: the controller is left either in the state it
/// had before the call or in a freshly reset one.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("{message}")]
    InvalidState { message: String },

    #[error("{operation} not supported on {platform}")]
    Unsupported {
        operation: &'static str,
        platform: &'static str,
    },

    #[error("Failed to play audio: {0}")]
    LaunchFailure(String),

    #[error("Failed to {action}: {reason}")]
    SignalFailure { action: &'static str, reason: String },
}

impl PlaybackError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        PlaybackError::InvalidState {
            message: message.into(),
        }
    }

    /// Machine-readable classification surfaced to tool callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::NotFound { .. } => ErrorKind::NotFound,
            PlaybackError::InvalidState { .. } => ErrorKind::InvalidState,
            PlaybackError::Unsupported { .. } => ErrorKind::Unsupported,
            PlaybackError::LaunchFailure(_) => ErrorKind::LaunchFailure,
            PlaybackError::SignalFailure { .. } => ErrorKind::SignalFailure,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::NotFound { path } => {
                format!("Cannot find audio file: {}", path.display())
            }
            PlaybackError::InvalidState { message } => message.clone(),
            PlaybackError::Unsupported { operation, platform } => {
                format!("{} is not available on {}", operation, platform)
            }
            PlaybackError::LaunchFailure(msg) => {
                format!("The audio renderer could not be started: {}", msg)
            }
            PlaybackError::SignalFailure { action, reason } => {
                format!("Could not {} the audio renderer: {}", action, reason)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlaybackError::NotFound { .. } => vec![
                "Check that the file path is correct".to_string(),
                "Try using an absolute path instead of a relative path".to_string(),
            ],
            PlaybackError::InvalidState { .. } => vec![
                "Use 'status' to see the current playback state".to_string(),
            ],
            PlaybackError::Unsupported { .. } => vec![
                "Use 'stop' and 'play' instead of pause and resume".to_string(),
            ],
            PlaybackError::LaunchFailure(_) => vec![
                "Check that the renderer program is installed and on PATH".to_string(),
                "Override the renderer with --renderer or in config.toml".to_string(),
            ],
            PlaybackError::SignalFailure { .. } => vec!["Use 'stop' to reset playback".to_string()],
        }
    }
}

/// Serialized form of [`PlaybackError::kind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Unsupported,
    LaunchFailure,
    SignalFailure,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Pass an explicit file with --config".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }
}

/// Errors raised while decoding a tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// JSON-RPC level failures on the stdio transport
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ProtocolError {
    /// JSON-RPC 2.0 error code for this failure
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::Parse(_) => -32700,
            ProtocolError::InvalidRequest(_) => -32600,
            ProtocolError::MethodNotFound(_) => -32601,
            ProtocolError::InvalidParams(_) => -32602,
            ProtocolError::Transport(_) => -32603,
        }
    }
}
