#[cfg(all(test, unix))]
mod integration_tests {
    use crate::cli::{CliApp, ConsoleCommand};
    use crate::error::PlaybackError;
    use crate::models::PlaybackState;
    use crate::platform::{HostPlatform, PlatformProfile, RendererCommand};
    use crate::playback::{PlaybackController, PlaybackTimings, StopOutcome};
    use crate::tools::call_tool;
    use crate::AppController;
    use clap::Parser;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    const LONG_RUNNING: &str = "exec sleep 30";
    const IGNORES_TERM: &str = "trap '' TERM; while :; do sleep 1; done";

    /// Create a stand-in audio file (renderers never read it)
    fn create_test_audio_file(dir: &Path, name: &str) -> PathBuf {
        let file_path = dir.join(name);
        std::fs::write(&file_path, b"RIFF dummy audio data").unwrap();
        file_path
    }

    fn fast_timings() -> PlaybackTimings {
        PlaybackTimings {
            launch_grace: Duration::from_millis(20),
            stop_timeout: Duration::from_millis(200),
        }
    }

    fn shell_renderer(script: &str) -> RendererCommand {
        RendererCommand::new("sh", &["-c", script, "renderer"])
    }

    fn controller_for(
        platform: HostPlatform,
        script: &str,
        timings: PlaybackTimings,
    ) -> PlaybackController {
        let profile = PlatformProfile::for_platform(platform).with_renderer(shell_renderer(script));
        PlaybackController::new(profile, timings)
    }

    fn controller(script: &str) -> PlaybackController {
        controller_for(HostPlatform::Linux, script, fast_timings())
    }

    fn is_alive(pid: u32) -> bool {
        // SAFETY: signal 0 only checks that the pid exists.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    async fn wait_for_state(controller: &PlaybackController, state: PlaybackState) -> bool {
        for _ in 0..100 {
            if controller.state().await == state {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_full_playback_scenario() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "speech.wav");
        let controller = controller(LONG_RUNNING);

        assert_ok!(controller.play(&track).await);
        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Playing);
        assert!(status.is_playing);
        assert_eq!(status.current_audio_path.as_deref(), Some(track.as_path()));

        tokio::time::sleep(Duration::from_millis(150)).await;
        let paused_at = assert_ok!(controller.pause().await);
        assert!(paused_at >= Duration::from_millis(150));
        assert!(paused_at < Duration::from_secs(5));

        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Paused);
        assert!(status.is_paused);
        assert!(status.pause_time.is_some());
        assert_eq!(status.position_ms, paused_at.as_millis() as u64);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.position().await, paused_at);

        assert_ok!(controller.resume().await);
        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Playing);
        assert!(status.pause_time.is_none());
        assert!(controller.position().await >= paused_at);

        let pid = controller.live_renderer_pid().await.unwrap();
        assert_eq!(controller.stop().await, StopOutcome::Stopped);

        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Stopped);
        assert!(status.current_audio_path.is_none());
        assert_eq!(status.position_ms, 0);
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_paused_time_is_not_counted() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(LONG_RUNNING);

        assert_ok!(controller.play(&track).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let paused_at = assert_ok!(controller.pause().await);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_ok!(controller.resume().await);

        let position = controller.position().await;
        assert!(position >= paused_at);
        assert!(position < paused_at + Duration::from_millis(300));

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_stop_from_every_state() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(LONG_RUNNING);

        // Idle
        assert_eq!(controller.stop().await, StopOutcome::NothingPlaying);
        assert_eq!(controller.state().await, PlaybackState::Idle);

        // Playing
        assert_ok!(controller.play(&track).await);
        let pid = controller.live_renderer_pid().await.unwrap();
        assert_eq!(controller.stop().await, StopOutcome::Stopped);
        assert_eq!(controller.state().await, PlaybackState::Stopped);
        assert!(!is_alive(pid));

        // Paused: the renderer is continued before it is terminated
        assert_ok!(controller.play(&track).await);
        let pid = controller.live_renderer_pid().await.unwrap();
        assert_ok!(controller.pause().await);
        assert_eq!(controller.stop().await, StopOutcome::Stopped);
        assert!(!is_alive(pid));

        // Stopped, repeatedly
        assert_eq!(controller.stop().await, StopOutcome::NothingPlaying);
        assert_eq!(controller.stop().await, StopOutcome::NothingPlaying);
        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Stopped);
        assert!(status.current_audio_path.is_none());
        assert_eq!(controller.live_renderer_pid().await, None);
    }

    #[tokio::test]
    async fn test_forced_stop_when_renderer_ignores_terminate() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(IGNORES_TERM);

        assert_ok!(controller.play(&track).await);
        let pid = controller.live_renderer_pid().await.unwrap();

        assert_eq!(controller.stop().await, StopOutcome::Forced);
        assert_eq!(controller.state().await, PlaybackState::Stopped);
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_pause_and_resume_guard_states() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(LONG_RUNNING);

        // Idle
        assert!(matches!(
            controller.pause().await,
            Err(PlaybackError::InvalidState { .. })
        ));
        assert!(matches!(
            controller.resume().await,
            Err(PlaybackError::InvalidState { .. })
        ));
        assert_eq!(controller.state().await, PlaybackState::Idle);

        // Playing: resume is rejected
        assert_ok!(controller.play(&track).await);
        let err = assert_err!(controller.resume().await);
        assert_eq!(err.to_string(), "No audio is currently paused");
        assert_eq!(controller.state().await, PlaybackState::Playing);

        // Paused: pause is rejected
        assert_ok!(controller.pause().await);
        let err = assert_err!(controller.pause().await);
        assert_eq!(err.to_string(), "No audio is currently playing");
        assert_eq!(controller.state().await, PlaybackState::Paused);

        // Stopped
        controller.stop().await;
        assert!(matches!(
            controller.pause().await,
            Err(PlaybackError::InvalidState { .. })
        ));
        assert_eq!(controller.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_play_missing_file_leaves_session_untouched() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let missing = dir.path().join("missing.wav");
        let controller = controller(LONG_RUNNING);

        // From Idle
        let err = assert_err!(controller.play(&missing).await);
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
        assert_eq!(controller.status().await.state, PlaybackState::Idle);

        // While playing another track
        assert_ok!(controller.play(&track).await);
        let pid = controller.live_renderer_pid().await;
        assert!(matches!(
            controller.play(&missing).await,
            Err(PlaybackError::NotFound { .. })
        ));

        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.current_audio_path.as_deref(), Some(track.as_path()));
        assert_eq!(controller.live_renderer_pid().await, pid);

        // A directory is not a playable file either
        assert!(matches!(
            controller.play(dir.path()).await,
            Err(PlaybackError::NotFound { .. })
        ));

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_pause_unsupported_without_suspend_signals() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller_for(HostPlatform::Windows, LONG_RUNNING, fast_timings());

        assert_ok!(controller.play(&track).await);
        match controller.pause().await {
            Err(PlaybackError::Unsupported { operation, platform }) => {
                assert_eq!(operation, "Pause");
                assert_eq!(platform, "Windows");
            }
            other => panic!("Expected Unsupported, got {:?}", other),
        }
        assert_eq!(controller.state().await, PlaybackState::Playing);

        assert_eq!(controller.stop().await, StopOutcome::Stopped);
        assert_eq!(controller.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_play_replaces_current_renderer() {
        let dir = TempDir::new().unwrap();
        let first = create_test_audio_file(dir.path(), "first.wav");
        let second = create_test_audio_file(dir.path(), "second.wav");
        let controller = controller(LONG_RUNNING);

        assert_ok!(controller.play(&first).await);
        let first_pid = controller.live_renderer_pid().await.unwrap();

        assert_ok!(controller.pause().await);
        assert_ok!(controller.play(&second).await);
        let second_pid = controller.live_renderer_pid().await.unwrap();

        assert_ne!(first_pid, second_pid);
        assert!(!is_alive(first_pid));
        assert!(is_alive(second_pid));

        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.current_audio_path.as_deref(), Some(second.as_path()));

        // A late exit of the first renderer must not disturb the second.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.state().await, PlaybackState::Playing);

        controller.stop().await;
        assert!(!is_alive(second_pid));
    }

    #[tokio::test]
    async fn test_natural_end_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "short.wav");
        let controller = controller("sleep 0.3");

        assert_ok!(controller.play(&track).await);
        assert_eq!(controller.state().await, PlaybackState::Playing);

        assert!(wait_for_state(&controller, PlaybackState::Idle).await);
        let status = controller.status().await;
        assert_eq!(status.current_audio_path.as_deref(), Some(track.as_path()));
        assert_eq!(status.position_ms, 0);
        assert_eq!(controller.live_renderer_pid().await, None);

        assert_eq!(controller.stop().await, StopOutcome::NothingPlaying);
        assert_eq!(controller.state().await, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_external_kill_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(LONG_RUNNING);

        assert_ok!(controller.play(&track).await);
        let pid = controller.live_renderer_pid().await.unwrap();
        // SAFETY: the pid belongs to the renderer this test just launched.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGKILL);
        }

        assert!(wait_for_state(&controller, PlaybackState::Idle).await);
        assert!(matches!(
            controller.pause().await,
            Err(PlaybackError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_launch_failure_when_renderer_fails_immediately() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let timings = PlaybackTimings {
            launch_grace: Duration::from_millis(1000),
            ..fast_timings()
        };
        let controller = controller_for(HostPlatform::Linux, "exit 3", timings);

        let err = assert_err!(controller.play(&track).await);
        assert!(matches!(err, PlaybackError::LaunchFailure(_)));
        assert_eq!(
            err.to_string(),
            "Failed to play audio: renderer exited with code 3"
        );

        let status = controller.status().await;
        assert_eq!(status.state, PlaybackState::Idle);
        assert!(status.current_audio_path.is_none());
    }

    #[tokio::test]
    async fn test_launch_failure_when_program_is_missing() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let profile = PlatformProfile::for_platform(HostPlatform::Linux)
            .with_renderer(RendererCommand::new("no-such-audio-renderer", &[]));
        let controller = PlaybackController::new(profile, fast_timings());

        assert!(matches!(
            controller.play(&track).await,
            Err(PlaybackError::LaunchFailure(_))
        ));
        assert_eq!(controller.state().await, PlaybackState::Idle);

        let events = controller.logger().get_recent_events(1);
        assert_eq!(
            events[0].event_type,
            crate::logging::PlaybackEventType::LaunchFailed
        );
    }

    #[tokio::test]
    async fn test_track_finishing_inside_grace_is_success() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "blip.wav");
        let timings = PlaybackTimings {
            launch_grace: Duration::from_millis(1000),
            ..fast_timings()
        };
        let controller = controller_for(HostPlatform::Linux, "exit 0", timings);

        assert_ok!(controller.play(&track).await);
        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert_eq!(controller.live_renderer_pid().await, None);
    }

    #[tokio::test]
    async fn test_renderer_receives_file_argument() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "with space.wav");
        let marker = dir.path().join("marker");
        let script = format!("cp \"$1\" '{}'; exec sleep 30", marker.display());
        let controller = controller(&script);

        assert_ok!(controller.play(&track).await);
        for _ in 0..100 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(std::fs::read(&marker).unwrap(), b"RIFF dummy audio data");

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_tools_against_real_controller() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let controller = controller(LONG_RUNNING);

        let result = call_tool(
            &controller,
            "play",
            Some(json!({ "audioPath": track.display().to_string() })),
        )
        .await;
        let body = result.body().unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["status"]["state"], json!("playing"));
        assert!(body["status"]["startTime"].is_number());

        let body = call_tool(&controller, "pause", None).await.body().unwrap();
        assert_eq!(body["success"], json!(true));
        assert!(body["positionMs"].is_number());

        let body = call_tool(&controller, "get_status", None).await.body().unwrap();
        assert_eq!(body["state"], json!("paused"));
        assert_eq!(body["isPaused"], json!(true));

        let body = call_tool(&controller, "stop", None).await.body().unwrap();
        assert_eq!(body["message"], json!("Stopped playback"));
        assert_eq!(body["status"]["state"], json!("stopped"));
        assert_eq!(body["status"]["currentAudioPath"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_app_controller_console_commands() {
        let dir = TempDir::new().unwrap();
        let track = create_test_audio_file(dir.path(), "a.wav");
        let config_path = dir.path().join("config.toml");

        let cli = CliApp::try_parse_from([
            "audio-player",
            "--config",
            config_path.to_str().unwrap(),
            "--renderer",
            "sh",
            "--renderer-arg",
            "-c",
            "--renderer-arg",
            LONG_RUNNING,
            "--renderer-arg",
            "renderer",
            "--grace-ms",
            "20",
            "--stop-timeout-ms",
            "200",
            "interactive",
        ])
        .unwrap();
        let app = AppController::new(cli).unwrap();

        assert_eq!(app.prompt().await, "> ");
        assert_ok!(app.execute_command(ConsoleCommand::Play { path: track.clone() }).await);
        assert_eq!(app.controller().state().await, PlaybackState::Playing);
        assert_eq!(app.controller().timings(), fast_timings());
        assert_eq!(app.controller().profile().renderer.program, "sh");
        assert_eq!(app.prompt().await, "▶ ");

        assert_ok!(app.execute_command(ConsoleCommand::Pause).await);
        assert_eq!(app.prompt().await, "⏸ ");
        assert_ok!(app.execute_command(ConsoleCommand::Resume).await);
        assert_ok!(app.execute_command(ConsoleCommand::Pause).await);
        assert_ok!(app.execute_command(ConsoleCommand::Status).await);
        assert_ok!(app.execute_command(ConsoleCommand::History { count: 5 }).await);
        assert_ok!(app.execute_command(ConsoleCommand::Stop).await);
        assert_eq!(app.controller().state().await, PlaybackState::Stopped);

        let result = app
            .execute_command(ConsoleCommand::Play {
                path: dir.path().join("missing.wav"),
            })
            .await;
        assert!(matches!(
            result,
            Err(crate::error::PlayerError::Playback(_))
        ));

        app.shutdown().await;
    }
}
