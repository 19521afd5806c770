use crate::error::ConfigError;
use crate::platform::RendererCommand;
use crate::playback::PlaybackTimings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Player configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// How long `play` waits for the renderer to fail before reporting success
    pub launch_grace_ms: u64,
    /// How long `stop` waits for a graceful exit before killing the renderer
    pub stop_timeout_ms: u64,
    pub log_level: String,
    /// Replaces the platform's default renderer when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererCommand>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let timings = PlaybackTimings::default();
        Self {
            launch_grace_ms: timings.launch_grace.as_millis() as u64,
            stop_timeout_ms: timings.stop_timeout.as_millis() as u64,
            log_level: "warn".to_string(),
            renderer: None,
        }
    }
}

impl PlayerConfig {
    pub fn timings(&self) -> PlaybackTimings {
        PlaybackTimings {
            launch_grace: Duration::from_millis(self.launch_grace_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

/// Configuration manager for loading settings
pub struct ConfigManager {
    config: PlayerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from `config_path`, falling back to defaults on a bad file.
    ///
    /// The load error is handed back instead of logged because this runs
    /// before logging is initialized.
    pub fn load_or_default(config_path: PathBuf) -> (Self, Option<ConfigError>) {
        let (config, error) = match Self::load_config(&config_path) {
            Ok(config) => (config, None),
            Err(e) => (PlayerConfig::default(), Some(e)),
        };

        let manager = Self {
            config,
            config_path,
        };
        (manager, error)
    }

    /// Default location: `~/.config/audio-player-tool/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("audio-player-tool");

        Ok(config_dir.join("config.toml"))
    }

    pub fn get_config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.config)?)
    }

    fn load_config(path: &Path) -> Result<PlayerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlayerConfig::default());
        }

        let config_content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: PlayerConfig =
            toml::from_str(&config_content).map_err(ConfigError::DeserializationError)?;

        Ok(config)
    }
}
