use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;

/// Program and base arguments used to render an audio file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RendererCommand {
    /// Marker replaced by the track path inside an argument
    pub const FILE_PLACEHOLDER: &'static str = "{file}";

    pub fn new<S: Into<String>>(program: S, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build the full argument list for `file`.
    ///
    /// Arguments containing `{file}` get the path substituted in place; when no
    /// argument mentions it, the path is appended as the last argument.
    pub fn arguments_for(&self, file: &Path) -> Vec<OsString> {
        let has_placeholder = self.args.iter().any(|a| a.contains(Self::FILE_PLACEHOLDER));
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(Self::FILE_PLACEHOLDER) {
                    OsString::from(arg.replace(Self::FILE_PLACEHOLDER, &file.to_string_lossy()))
                } else {
                    OsString::from(arg)
                }
            })
            .collect();

        if !has_placeholder {
            args.push(file.as_os_str().to_os_string());
        }
        args
    }

    /// Human-readable command line, for logs
    pub fn describe(&self, file: &Path) -> String {
        let args: Vec<String> = self
            .arguments_for(file)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        format!("{} {}", self.program, args.join(" "))
    }
}

/// Host operating systems with a known renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    MacOs,
    Linux,
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value onto a platform entry
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => HostPlatform::MacOs,
            "linux" => HostPlatform::Linux,
            "windows" => HostPlatform::Windows,
            _ => HostPlatform::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostPlatform::MacOs => "macOS",
            HostPlatform::Linux => "Linux",
            HostPlatform::Windows => "Windows",
            HostPlatform::Other => "this platform",
        }
    }

    /// Whether processes can be suspended and continued with signals
    pub fn supports_suspend(&self) -> bool {
        !matches!(self, HostPlatform::Windows)
    }

    pub fn default_renderer(&self) -> RendererCommand {
        match self {
            HostPlatform::MacOs => RendererCommand::new("afplay", &[]),
            HostPlatform::Linux => RendererCommand::new("aplay", &["-q"]),
            HostPlatform::Windows => RendererCommand::new(
                "powershell",
                &[
                    "-NoProfile",
                    "-c",
                    "(New-Object Media.SoundPlayer '{file}').PlaySync()",
                ],
            ),
            HostPlatform::Other => RendererCommand::new("mpv", &["--no-video", "--really-quiet"]),
        }
    }
}

/// Renderer selection plus the capabilities the controller must respect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: HostPlatform,
    pub renderer: RendererCommand,
    pub supports_suspend: bool,
}

impl PlatformProfile {
    pub fn current() -> Self {
        Self::for_platform(HostPlatform::current())
    }

    pub fn for_platform(platform: HostPlatform) -> Self {
        Self {
            platform,
            renderer: platform.default_renderer(),
            supports_suspend: platform.supports_suspend(),
        }
    }

    /// Replace the renderer while keeping the platform's capabilities
    pub fn with_renderer(mut self, renderer: RendererCommand) -> Self {
        self.renderer = renderer;
        self
    }

    /// Reject `operation` when the platform cannot suspend processes
    pub fn ensure_suspend(&self, operation: &'static str) -> Result<(), PlaybackError> {
        if self.supports_suspend {
            Ok(())
        } else {
            Err(PlaybackError::Unsupported {
                operation,
                platform: self.platform.name(),
            })
        }
    }
}
