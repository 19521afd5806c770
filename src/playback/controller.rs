use crate::error::PlaybackError;
use crate::logging::PlaybackLogger;
use crate::models::{PlaybackState, PlayerStatus};
use crate::platform::PlatformProfile;
use crate::playback::renderer::{Renderer, RendererExited, Signal};
use crate::playback::session::PlaybackSession;
use crate::playback::{PlaybackControl, PlaybackTimings, StopOutcome};
use chrono::Utc;
use log::{debug, warn};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// Owns at most one renderer process and the playback state derived from it.
///
/// Every operation locks the session for its whole duration, so transitions
/// never interleave. Renderer exits arrive on a channel and go through the
/// same lock.
pub struct PlaybackController {
    session: Arc<Mutex<PlaybackSession>>,
    profile: PlatformProfile,
    timings: PlaybackTimings,
    exit_tx: mpsc::UnboundedSender<RendererExited>,
    logger: PlaybackLogger,
}

impl PlaybackController {
    /// Create a controller. Must be called from within a Tokio runtime.
    pub fn new(profile: PlatformProfile, timings: PlaybackTimings) -> Self {
        Self::with_logger(profile, timings, PlaybackLogger::new())
    }

    pub fn with_logger(
        profile: PlatformProfile,
        timings: PlaybackTimings,
        logger: PlaybackLogger,
    ) -> Self {
        let session = Arc::new(Mutex::new(PlaybackSession::new()));
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        tokio::spawn(watch_exits(
            Arc::downgrade(&session),
            exit_rx,
            logger.clone(),
        ));

        Self {
            session,
            profile,
            timings,
            exit_tx,
            logger,
        }
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn timings(&self) -> PlaybackTimings {
        self.timings
    }

    pub fn logger(&self) -> &PlaybackLogger {
        &self.logger
    }

    pub async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        if !path.is_file() {
            return Err(PlaybackError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut session = self.session.lock().await;
        if let Some(outcome) = self.stop_locked(&mut session).await {
            debug!("Replaced previous renderer: {}", outcome.message());
        }

        let track = path.display().to_string();
        let generation = session.next_generation();
        let renderer = match Renderer::spawn(
            &self.profile.renderer,
            path,
            generation,
            self.exit_tx.clone(),
        ) {
            Ok(renderer) => renderer,
            Err(e) => {
                session.reset(PlaybackState::Idle);
                self.logger.log_launch_failed(&track, &e.to_string());
                return Err(e);
            }
        };

        let pid = renderer.pid();
        session.begin(path.to_path_buf(), Instant::now());
        session.attach(renderer);
        self.logger
            .log_playback_started(&track, &self.profile.renderer.describe(path));

        let early_exit = match session.renderer() {
            Some(renderer) => renderer.wait_for_exit(self.timings.launch_grace).await,
            None => None,
        };

        match early_exit {
            Some(report) if !report.success => {
                session.reset(PlaybackState::Idle);
                let reason = report.describe();
                self.logger.log_launch_failed(&track, &reason);
                Err(PlaybackError::LaunchFailure(reason))
            }
            Some(report) => {
                // Very short tracks can finish inside the grace window.
                session.on_renderer_exit(generation);
                self.logger.log_renderer_exited(pid, report.code);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub async fn pause(&self) -> Result<Duration, PlaybackError> {
        let mut session = self.session.lock().await;
        self.reap(&mut session);

        let renderer = match session.renderer() {
            Some(renderer) if session.state() == PlaybackState::Playing => renderer,
            _ => return Err(PlaybackError::invalid_state("No audio is currently playing")),
        };

        self.profile.ensure_suspend("Pause")?;
        if let Err(e) = renderer.signal(Signal::Suspend).await {
            self.logger
                .log_signal_failed(Signal::Suspend.as_str(), &e.to_string());
            return Err(e);
        }

        let position = session.mark_paused(Instant::now());
        self.logger.log_playback_paused(position);
        Ok(position)
    }

    pub async fn resume(&self) -> Result<(), PlaybackError> {
        let mut session = self.session.lock().await;
        self.reap(&mut session);

        let renderer = match session.renderer() {
            Some(renderer) if session.state() == PlaybackState::Paused => renderer,
            _ => return Err(PlaybackError::invalid_state("No audio is currently paused")),
        };

        self.profile.ensure_suspend("Resume")?;
        if let Err(e) = renderer.signal(Signal::Continue).await {
            self.logger
                .log_signal_failed(Signal::Continue.as_str(), &e.to_string());
            return Err(e);
        }

        let paused_for = session.mark_resumed(Instant::now());
        self.logger.log_playback_resumed(paused_for);
        Ok(())
    }

    pub async fn stop(&self) -> StopOutcome {
        let mut session = self.session.lock().await;
        match self.stop_locked(&mut session).await {
            Some(outcome) => {
                self.logger.log_playback_stopped(outcome.message());
                outcome
            }
            None => {
                let settled = match session.state() {
                    PlaybackState::Stopped => PlaybackState::Stopped,
                    _ => PlaybackState::Idle,
                };
                session.reset(settled);
                StopOutcome::NothingPlaying
            }
        }
    }

    pub async fn status(&self) -> PlayerStatus {
        let mut session = self.session.lock().await;
        self.reap(&mut session);
        session.status_at(Instant::now(), Utc::now())
    }

    pub async fn position(&self) -> Duration {
        let session = self.session.lock().await;
        session.position_at(Instant::now())
    }

    pub async fn state(&self) -> PlaybackState {
        let mut session = self.session.lock().await;
        self.reap(&mut session);
        session.state()
    }

    pub async fn is_playing(&self) -> bool {
        self.state().await == PlaybackState::Playing
    }

    pub async fn is_paused(&self) -> bool {
        self.state().await == PlaybackState::Paused
    }

    /// Process id of the renderer the session still owns, if it is running
    pub async fn live_renderer_pid(&self) -> Option<u32> {
        let session = self.session.lock().await;
        session
            .renderer()
            .filter(|renderer| !renderer.has_exited())
            .and_then(Renderer::pid)
    }

    /// Stop playback before the process exits
    pub async fn shutdown(&self) {
        let outcome = self.stop().await;
        debug!("Playback controller shut down: {}", outcome.message());
    }

    /// Terminate and reap the owned renderer, leaving the session Stopped.
    ///
    /// Returns `None` when no renderer was owned; the session is untouched then.
    async fn stop_locked(&self, session: &mut PlaybackSession) -> Option<StopOutcome> {
        let mut renderer = session.take_renderer()?;
        let was_paused = session.state() == PlaybackState::Paused;
        session.reset(PlaybackState::Stopped);

        if renderer.has_exited() {
            return Some(StopOutcome::Stopped);
        }

        // A suspended process would not act on SIGTERM until continued.
        if was_paused && self.profile.supports_suspend {
            if let Err(e) = renderer.signal(Signal::Continue).await {
                self.logger
                    .log_signal_failed(Signal::Continue.as_str(), &e.to_string());
            }
        }

        if let Err(e) = renderer.terminate().await {
            self.logger
                .log_signal_failed(Signal::Terminate.as_str(), &e.to_string());
        }
        if renderer.wait_for_exit(self.timings.stop_timeout).await.is_some() {
            return Some(StopOutcome::Stopped);
        }

        warn!(
            "Renderer {:?} ignored terminate request, killing it",
            renderer.pid()
        );
        renderer.kill();
        if renderer.wait_for_exit(self.timings.stop_timeout).await.is_none() {
            warn!("Renderer {:?} was not reaped after kill", renderer.pid());
        }
        Some(StopOutcome::Forced)
    }

    fn reap(&self, session: &mut PlaybackSession) {
        let exited = session
            .renderer()
            .filter(|renderer| renderer.has_exited())
            .map(|renderer| (renderer.pid(), renderer.exit_report()));

        if let Some((pid, report)) = exited {
            if session.reap_exited() {
                self.logger
                    .log_renderer_exited(pid, report.and_then(|r| r.code));
            }
        }
    }
}

impl PlaybackControl for PlaybackController {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        PlaybackController::play(self, path).await
    }

    async fn pause(&self) -> Result<Duration, PlaybackError> {
        PlaybackController::pause(self).await
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        PlaybackController::resume(self).await
    }

    async fn stop(&self) -> StopOutcome {
        PlaybackController::stop(self).await
    }

    async fn status(&self) -> PlayerStatus {
        PlaybackController::status(self).await
    }
}

/// Apply renderer exit notifications until the controller goes away
async fn watch_exits(
    session: Weak<Mutex<PlaybackSession>>,
    mut exits: mpsc::UnboundedReceiver<RendererExited>,
    logger: PlaybackLogger,
) {
    while let Some(event) = exits.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };

        let applied = session.lock().await.on_renderer_exit(event.generation);
        if applied {
            logger.log_renderer_exited(event.pid, event.report.code);
        } else {
            debug!(
                "Ignoring exit of stale renderer generation {}",
                event.generation
            );
        }
    }
}
