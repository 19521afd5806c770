use crate::error::{ErrorSeverity, PlayerError};
use crate::logging::PlaybackEvent;
use crate::models::{PlaybackState, PlayerStatus};
use chrono::{Local, TimeZone};
use std::time::Duration;

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display player status with track and timing information
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Player Status ─────────────────────────────────────────┐");
        println!("│ Status: {}", Self::format_playback_state(status.state));

        match &status.current_audio_path {
            Some(path) => {
                let name = status.track_name().unwrap_or_default();
                println!("│ Track: {}", Self::truncate(&name, 50));
                println!(
                    "│ Path: {}",
                    Self::truncate(&path.display().to_string(), 51)
                );
                println!("│ Position: ~{}", Self::format_duration(status.position()));
                if let Some(started) = status.start_time {
                    println!("│ Started: {}", Self::format_timestamp(started));
                }
                if let Some(paused) = status.pause_time {
                    println!("│ Paused since: {}", Self::format_timestamp(paused));
                }
            }
            None => println!("│ No track loaded"),
        }

        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display recent playback events, oldest first
    pub fn display_history(events: &[PlaybackEvent]) {
        if events.is_empty() {
            println!("No playback events yet");
            return;
        }

        for event in events {
            println!(
                "{} {:<17} {}",
                event.timestamp.with_timezone(&Local).format("%H:%M:%S%.3f"),
                event.event_type.as_str(),
                event.details
            );
        }
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
        };

        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon,
            severity.as_str()
        );

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + word.len() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        lines
            .into_iter()
            .map(|line| format!("{:<width$}", line, width = width))
            .collect()
    }

    /// Format duration as MM:SS or HH:MM:SS for longer tracks
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    /// Local wall-clock time for a millisecond Unix timestamp
    pub fn format_timestamp(epoch_ms: i64) -> String {
        match Local.timestamp_millis_opt(epoch_ms).single() {
            Some(time) => time.format("%H:%M:%S").to_string(),
            None => epoch_ms.to_string(),
        }
    }

    /// Truncate string to fit display width
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn format_playback_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::Idle => "◻ Idle".to_string(),
            PlaybackState::Playing => "▶ Playing".to_string(),
            PlaybackState::Paused => "⏸ Paused".to_string(),
            PlaybackState::Stopped => "⏹ Stopped".to_string(),
        }
    }
}
