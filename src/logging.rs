use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Environment variable that overrides the configured log level
pub const LOG_LEVEL_ENV: &str = "AUDIO_PLAYER_LOG_LEVEL";

/// Playback event for logging and debugging
#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: PlaybackEventType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEventType {
    PlaybackStarted,
    PlaybackPaused,
    PlaybackResumed,
    PlaybackStopped,
    RendererExited,
    LaunchFailed,
    SignalFailed,
}

impl PlaybackEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackEventType::PlaybackStarted => "PLAYBACK_STARTED",
            PlaybackEventType::PlaybackPaused => "PLAYBACK_PAUSED",
            PlaybackEventType::PlaybackResumed => "PLAYBACK_RESUMED",
            PlaybackEventType::PlaybackStopped => "PLAYBACK_STOPPED",
            PlaybackEventType::RendererExited => "RENDERER_EXITED",
            PlaybackEventType::LaunchFailed => "LAUNCH_FAILED",
            PlaybackEventType::SignalFailed => "SIGNAL_FAILED",
        }
    }
}

/// Logger for playback transitions with a bounded in-memory history
#[derive(Clone)]
pub struct PlaybackLogger {
    events: Arc<Mutex<VecDeque<PlaybackEvent>>>,
    max_events: usize,
}

impl PlaybackLogger {
    pub fn new() -> Self {
        Self::with_capacity(200)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events,
        }
    }

    /// Initialize the `log` backend.
    ///
    /// `AUDIO_PLAYER_LOG_LEVEL` wins over `default_level`. Output always goes to
    /// stderr because stdout carries the tool protocol.
    pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_level.to_string());

        let mut builder = env_logger::Builder::new();
        builder.target(env_logger::Target::Stderr);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        builder.filter_level(Self::parse_level(&log_level));
        builder.try_init()?;

        info!("Audio player logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Map a level name onto a filter, defaulting to `Warn`
    pub fn parse_level(level: &str) -> log::LevelFilter {
        match level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" | "warning" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Warn,
        }
    }

    /// Record an event and forward it to the log facade
    pub fn log_event(&self, event_type: PlaybackEventType, details: String) {
        match event_type {
            PlaybackEventType::PlaybackStarted
            | PlaybackEventType::PlaybackPaused
            | PlaybackEventType::PlaybackResumed
            | PlaybackEventType::PlaybackStopped => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::RendererExited => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::SignalFailed => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::LaunchFailed => {
                error!("[{}] {}", event_type.as_str(), details);
            }
        }

        let event = PlaybackEvent {
            timestamp: Utc::now(),
            event_type,
            details,
        };

        if let Ok(mut events) = self.events.lock() {
            events.push_back(event);
            while events.len() > self.max_events {
                events.pop_front();
            }
        }
    }

    pub fn log_playback_started(&self, track_path: &str, command: &str) {
        self.log_event(
            PlaybackEventType::PlaybackStarted,
            format!("Playing: {} ({})", track_path, command),
        );
    }

    pub fn log_playback_paused(&self, position: Duration) {
        self.log_event(
            PlaybackEventType::PlaybackPaused,
            format!("Paused at ~{}ms", position.as_millis()),
        );
    }

    pub fn log_playback_resumed(&self, paused_for: Duration) {
        self.log_event(
            PlaybackEventType::PlaybackResumed,
            format!("Resumed playback after {}ms", paused_for.as_millis()),
        );
    }

    pub fn log_playback_stopped(&self, reason: &str) {
        self.log_event(
            PlaybackEventType::PlaybackStopped,
            format!("Playback stopped: {}", reason),
        );
    }

    pub fn log_renderer_exited(&self, pid: Option<u32>, code: Option<i32>) {
        let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        let pid = pid.map_or_else(|| "?".to_string(), |p| p.to_string());
        self.log_event(
            PlaybackEventType::RendererExited,
            format!("Renderer {} finished with code {}", pid, code),
        );
    }

    pub fn log_launch_failed(&self, track_path: &str, error: &str) {
        self.log_event(
            PlaybackEventType::LaunchFailed,
            format!("Could not start renderer for '{}': {}", track_path, error),
        );
    }

    pub fn log_signal_failed(&self, signal: &str, error: &str) {
        self.log_event(
            PlaybackEventType::SignalFailed,
            format!("Delivering {} failed: {}", signal, error),
        );
    }

    /// Get recent events, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<PlaybackEvent> {
        match self.events.lock() {
            Ok(events) => {
                let skip = events.len().saturating_sub(count);
                events.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Default for PlaybackLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_logger_creation() {
        let logger = PlaybackLogger::new();
        assert!(logger.get_recent_events(10).is_empty());
    }

    #[test]
    fn test_log_event() {
        let logger = PlaybackLogger::new();
        logger.log_event(PlaybackEventType::PlaybackStarted, "Test track".to_string());

        let events = logger.get_recent_events(1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, PlaybackEventType::PlaybackStarted);
        assert_eq!(events[0].details, "Test track");
    }

    #[test]
    fn test_event_history_limit() {
        let logger = PlaybackLogger::with_capacity(5);
        for i in 0..10 {
            logger.log_event(PlaybackEventType::PlaybackPaused, format!("Event {}", i));
        }

        let events = logger.get_recent_events(100);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].details, "Event 5");
        assert_eq!(events[4].details, "Event 9");
    }

    #[test]
    fn test_recent_events_are_oldest_first() {
        let logger = PlaybackLogger::new();
        logger.log_playback_started("/a.wav", "aplay -q /a.wav");
        logger.log_playback_paused(Duration::from_millis(1200));
        logger.log_playback_stopped("user request");

        let events = logger.get_recent_events(2);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, PlaybackEventType::PlaybackPaused);
        assert_eq!(events[0].details, "Paused at ~1200ms");
        assert_eq!(events[1].event_type, PlaybackEventType::PlaybackStopped);
    }

    #[test]
    fn test_renderer_exit_details() {
        let logger = PlaybackLogger::new();
        logger.log_renderer_exited(Some(42), Some(0));
        logger.log_renderer_exited(None, None);

        let events = logger.get_recent_events(2);
        assert_eq!(events[0].details, "Renderer 42 finished with code 0");
        assert_eq!(events[1].details, "Renderer ? finished with code signal");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(
            PlaybackLogger::parse_level("DEBUG"),
            log::LevelFilter::Debug
        );
        assert_eq!(PlaybackLogger::parse_level("off"), log::LevelFilter::Off);
        assert_eq!(
            PlaybackLogger::parse_level("nonsense"),
            log::LevelFilter::Warn
        );
    }

    #[test]
    fn test_event_type_as_str() {
        assert_eq!(
            PlaybackEventType::PlaybackStarted.as_str(),
            "PLAYBACK_STARTED"
        );
        assert_eq!(
            PlaybackEventType::RendererExited.as_str(),
            "RENDERER_EXITED"
        );
    }
}
