use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing has been started, or the renderer finished on its own
    #[default]
    Idle,
    Playing,
    Paused,
    /// Reached through an explicit stop
    Stopped,
}

impl PlaybackState {
    /// Get the wire representation used by tool results
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        }
    }

    /// Whether a renderer may be owned in this state
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the playback session as reported to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub current_audio_path: Option<PathBuf>,
    pub position_ms: u64,
    pub is_playing: bool,
    pub is_paused: bool,
    /// Wall-clock start of the current playback epoch, in milliseconds since the Unix epoch
    pub start_time: Option<i64>,
    /// Wall-clock time the current pause began, in milliseconds since the Unix epoch
    pub pause_time: Option<i64>,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            current_audio_path: None,
            position_ms: 0,
            is_playing: false,
            is_paused: false,
            start_time: None,
            pause_time: None,
        }
    }

    /// Estimated position as a duration
    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms)
    }

    /// File name of the current track, if any
    pub fn track_name(&self) -> Option<String> {
        self.current_audio_path.as_ref().map(|path| {
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string()
        })
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new()
    }
}
