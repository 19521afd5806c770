use crate::config::PlayerConfig;
use crate::platform::RendererCommand;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod status;
pub use status::StatusDisplay;

/// Audio playback tool server
#[derive(Debug, Parser)]
#[command(name = "audio-player")]
#[command(about = "Tool server that lets an agent play, pause, resume and stop local audio files")]
#[command(version)]
pub struct CliApp {
    /// Configuration file to use instead of ~/.config/audio-player-tool/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Renderer program replacing the platform default
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub renderer: Option<String>,

    /// Argument for --renderer; repeatable, "{file}" marks where the track goes
    #[arg(
        long = "renderer-arg",
        global = true,
        value_name = "ARG",
        allow_hyphen_values = true
    )]
    pub renderer_args: Vec<String>,

    /// Launch grace interval in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub grace_ms: Option<u64>,

    /// Stop escalation timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub stop_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Serve the playback tools over stdio (default)
    Serve,
    /// Control playback from a line-oriented console
    Interactive,
    /// Print the tool catalog as JSON
    Tools,
    /// Print the effective configuration and where it lives
    Config,
}

/// Commands accepted by the interactive console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Play { path: PathBuf },
    Pause,
    Resume,
    Stop,
    Status,
    History { count: usize },
    Exit,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Command to run, defaulting to `serve`
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }

    /// Apply command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut PlayerConfig) {
        if let Some(program) = &self.renderer {
            config.renderer = Some(RendererCommand {
                program: program.clone(),
                args: self.renderer_args.clone(),
            });
        }
        if let Some(grace_ms) = self.grace_ms {
            config.launch_grace_ms = grace_ms;
        }
        if let Some(stop_timeout_ms) = self.stop_timeout_ms {
            config.stop_timeout_ms = stop_timeout_ms;
        }
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home_dir) => home_dir.join(rest),
                None => PathBuf::from(path),
            }
        } else if path == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<ConsoleCommand, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "play" => {
                if args.len() > 1 {
                    let path = Self::expand_path(&args[1..].join(" "));
                    Ok(ConsoleCommand::Play { path })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "play".to_string(),
                        argument: "path".to_string(),
                    })
                }
            }
            "pause" => Ok(ConsoleCommand::Pause),
            "resume" => Ok(ConsoleCommand::Resume),
            "stop" => Ok(ConsoleCommand::Stop),
            "status" => Ok(ConsoleCommand::Status),
            "history" => match args.get(1) {
                None => Ok(ConsoleCommand::History { count: 10 }),
                Some(value) => match value.parse::<usize>() {
                    Ok(count) if count > 0 => Ok(ConsoleCommand::History { count }),
                    _ => Err(ParseError::InvalidArgument {
                        argument: "count".to_string(),
                        value: value.to_string(),
                        expected: "a positive number".to_string(),
                    }),
                },
            },
            "exit" | "quit" => Ok(ConsoleCommand::Exit),
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    /// Display help information
    pub fn display_help() {
        println!("Audio Player - Available Commands:");
        println!();
        println!("Playback Control:");
        println!("  play <path>     - Play an audio file, replacing the current one");
        println!("  pause           - Pause playback");
        println!("  resume          - Resume paused playback");
        println!("  stop            - Stop playback");
        println!();
        println!("Information:");
        println!("  status          - Show current playback status");
        println!("  history [n]     - Show the last n playback events (default 10)");
        println!();
        println!("General:");
        println!("  help            - Show this help message");
        println!("  exit, quit      - Stop playback and exit");
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Help requested")]
    HelpRequested,
}
