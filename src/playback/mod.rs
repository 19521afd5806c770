pub mod controller;
pub mod renderer;
pub mod session;

use crate::error::PlaybackError;
use crate::models::PlayerStatus;
use std::path::Path;
use std::time::Duration;

pub use controller::PlaybackController;

/// How long `play` waits for an immediate renderer failure
pub const DEFAULT_LAUNCH_GRACE: Duration = Duration::from_millis(100);

/// How long each stop phase waits for the renderer to go away
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timing knobs of the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTimings {
    pub launch_grace: Duration,
    pub stop_timeout: Duration,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            launch_grace: DEFAULT_LAUNCH_GRACE,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// What `stop` had to do to reach a clean session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NothingPlaying,
    Stopped,
    /// The renderer ignored the terminate request and was killed
    Forced,
}

impl StopOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            StopOutcome::NothingPlaying => "No audio is playing",
            StopOutcome::Stopped => "Stopped playback",
            StopOutcome::Forced => "Stopped playback (force)",
        }
    }
}

/// Core trait for playback control.
///
/// The tool layer talks to the controller only through this trait.
#[allow(async_fn_in_trait)]
pub trait PlaybackControl {
    /// Start playing `path`, replacing whatever is playing
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;

    /// Suspend playback; returns the estimated position at suspension
    async fn pause(&self) -> Result<Duration, PlaybackError>;

    /// Continue suspended playback
    async fn resume(&self) -> Result<(), PlaybackError>;

    /// Stop playback and release the renderer. Never fails.
    async fn stop(&self) -> StopOutcome;

    /// Snapshot of the session
    async fn status(&self) -> PlayerStatus;
}
