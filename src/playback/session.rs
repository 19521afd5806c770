use crate::models::{PlaybackState, PlayerStatus};
use crate::playback::renderer::Renderer;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Mutable record behind a [`PlaybackController`](super::PlaybackController).
///
/// Time-dependent methods take `now` explicitly so the epoch arithmetic can be
/// exercised without sleeping.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    state: PlaybackState,
    current_track: Option<PathBuf>,
    /// Start of the current playback epoch, moved forward by every resume
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_offset: Duration,
    renderer: Option<Renderer>,
    launched: u64,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[cfg(test)]
    pub fn current_track(&self) -> Option<&std::path::Path> {
        self.current_track.as_deref()
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    #[cfg(test)]
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Generation number for the next renderer launch
    pub fn next_generation(&mut self) -> u64 {
        self.launched += 1;
        self.launched
    }

    /// Open a new playback epoch for `track`
    pub fn begin(&mut self, track: PathBuf, now: Instant) {
        self.state = PlaybackState::Playing;
        self.current_track = Some(track);
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_offset = Duration::ZERO;
    }

    pub fn attach(&mut self, renderer: Renderer) {
        self.renderer = Some(renderer);
    }

    pub fn take_renderer(&mut self) -> Option<Renderer> {
        self.renderer.take()
    }

    /// Freeze the position estimate; returns the frozen offset
    pub fn mark_paused(&mut self, now: Instant) -> Duration {
        self.paused_offset = self
            .started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        self.paused_at = Some(now);
        self.state = PlaybackState::Paused;
        self.paused_offset
    }

    /// Shift the epoch past the pause gap; returns how long playback was paused
    pub fn mark_resumed(&mut self, now: Instant) -> Duration {
        let paused_for = self
            .paused_at
            .take()
            .map(|paused| now.saturating_duration_since(paused))
            .unwrap_or_default();

        if let Some(started) = self.started_at.as_mut() {
            *started += paused_for;
        }
        self.state = PlaybackState::Playing;
        paused_for
    }

    /// Estimated elapsed playback at `now`
    pub fn position_at(&self, now: Instant) -> Duration {
        match self.state {
            PlaybackState::Paused => self.paused_offset,
            PlaybackState::Playing => self
                .started_at
                .map(|started| now.saturating_duration_since(started))
                .unwrap_or_default(),
            PlaybackState::Idle | PlaybackState::Stopped => Duration::ZERO,
        }
    }

    /// Clear every field and settle in `state`. Any renderer still attached is
    /// dropped, which kills it.
    pub fn reset(&mut self, state: PlaybackState) {
        self.state = state;
        self.current_track = None;
        self.started_at = None;
        self.paused_at = None;
        self.paused_offset = Duration::ZERO;
        self.renderer = None;
    }

    /// Apply an exit notification for renderer `generation`.
    ///
    /// Stale notifications (for a renderer no longer attached) are ignored.
    /// Track and timing fields stay for inspection until the next play.
    pub fn on_renderer_exit(&mut self, generation: u64) -> bool {
        let current = self.renderer.as_ref().map(Renderer::generation);
        if current != Some(generation) {
            return false;
        }

        self.renderer = None;
        if self.state.is_active() {
            self.state = PlaybackState::Idle;
        }
        true
    }

    /// Apply the exit of the attached renderer if the watcher already reaped it
    pub fn reap_exited(&mut self) -> bool {
        match self.renderer.as_ref() {
            Some(renderer) if renderer.has_exited() => {
                let generation = renderer.generation();
                self.on_renderer_exit(generation)
            }
            _ => false,
        }
    }

    pub fn status_at(&self, now: Instant, wall_now: DateTime<Utc>) -> PlayerStatus {
        let to_wall = |instant: Instant| {
            let age = now.saturating_duration_since(instant).as_millis() as i64;
            wall_now.timestamp_millis() - age
        };

        PlayerStatus {
            state: self.state,
            current_audio_path: self.current_track.clone(),
            position_ms: self.position_at(now).as_millis() as u64,
            is_playing: self.state == PlaybackState::Playing,
            is_paused: self.state == PlaybackState::Paused,
            start_time: self.started_at.map(to_wall),
            pause_time: self.paused_at.map(to_wall),
        }
    }
}
