mod cli;
mod config;
mod error;
mod logging;
mod models;
mod platform;
mod playback;
mod tools;

#[cfg(test)]
mod integration_tests;

use cli::{CliApp, Commands, ConsoleCommand, ParseError, StatusDisplay};
use config::ConfigManager;
use error::{PlayerError, ProtocolError};
use log::{error, info, warn};
use logging::PlaybackLogger;
use platform::PlatformProfile;
use playback::PlaybackController;
use tokio::sync::watch;
use tools::server::{shutdown_requested, ToolServer};

/// Main application controller that wires configuration, playback and front ends
pub struct AppController {
    controller: PlaybackController,
    config_manager: ConfigManager,
    cli_app: CliApp,
}

impl AppController {
    /// Create the application from parsed arguments. Initializes logging.
    pub fn new(cli_app: CliApp) -> Result<Self, PlayerError> {
        let config_path = match &cli_app.config {
            Some(path) => path.clone(),
            None => ConfigManager::default_config_path()?,
        };
        let (config_manager, load_error) = ConfigManager::load_or_default(config_path);

        if let Err(e) = PlaybackLogger::init(&config_manager.get_config().log_level) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }
        if let Some(e) = load_error {
            warn!(
                "Ignoring configuration at {}: {}",
                config_manager.config_path().display(),
                e
            );
        }

        let mut config = config_manager.get_config().clone();
        cli_app.apply_overrides(&mut config);

        let mut profile = PlatformProfile::current();
        if let Some(renderer) = config.renderer.clone() {
            profile = profile.with_renderer(renderer);
        }

        let controller = PlaybackController::new(profile, config.timings());
        let profile = controller.profile();
        let timings = controller.timings();
        info!(
            "Using renderer '{}' on {} (grace {}ms, stop timeout {}ms)",
            profile.renderer.program,
            profile.platform.name(),
            timings.launch_grace.as_millis(),
            timings.stop_timeout.as_millis()
        );

        Ok(Self {
            controller,
            config_manager,
            cli_app,
        })
    }

    #[cfg(test)]
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Run the selected command to completion
    pub async fn run(&self) -> Result<(), PlayerError> {
        match self.cli_app.command() {
            Commands::Serve => {
                let shutdown = Self::install_interrupt_handler();
                self.run_server(shutdown).await
            }
            Commands::Interactive => {
                let shutdown = Self::install_interrupt_handler();
                self.run_interactive_mode(shutdown).await
            }
            Commands::Tools => {
                let catalog = serde_json::to_string_pretty(&tools::tool_catalog())
                    .map_err(ProtocolError::from)?;
                println!("{}", catalog);
                Ok(())
            }
            Commands::Config => {
                println!("# {}", self.config_manager.config_path().display());
                print!("{}", self.config_manager.to_toml()?);
                Ok(())
            }
        }
    }

    /// Serve the tool protocol on stdin/stdout
    pub async fn run_server(&self, shutdown: watch::Receiver<bool>) -> Result<(), PlayerError> {
        let server = ToolServer::new(&self.controller);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        server.run(stdin, tokio::io::stdout(), shutdown).await?;
        Ok(())
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), PlayerError> {
        println!("Audio Player v{}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        // Blocking stdin reads live on their own thread
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        loop {
            print!("{}", self.prompt().await);
            let _ = std::io::Write::flush(&mut std::io::stdout());

            tokio::select! {
                line = rx.recv() => {
                    let Some(line) = line else {
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }

                    match CliApp::parse_command(&line) {
                        Ok(ConsoleCommand::Exit) => {
                            println!("Goodbye!");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command).await {
                                self.handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => self.handle_error(&e.into()),
                    }
                }
                _ = shutdown_requested(&mut shutdown) => {
                    println!("\nReceived interrupt signal. Shutting down gracefully...");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Execute a single console command
    pub async fn execute_command(&self, command: ConsoleCommand) -> Result<(), PlayerError> {
        match command {
            ConsoleCommand::Play { path } => {
                self.controller.play(&path).await?;
                println!("Playing: {}", path.display());
            }
            ConsoleCommand::Pause => {
                let position = self.controller.pause().await?;
                println!("Paused at ~{}ms", position.as_millis());
            }
            ConsoleCommand::Resume => {
                self.controller.resume().await?;
                let position = self.controller.position().await;
                println!("Resumed playback at ~{}ms", position.as_millis());
            }
            ConsoleCommand::Stop => {
                let outcome = self.controller.stop().await;
                println!("{}", outcome.message());
            }
            ConsoleCommand::Status => {
                StatusDisplay::display_full_status(&self.controller.status().await);
                if let Some(pid) = self.controller.live_renderer_pid().await {
                    println!("Renderer process: {}", pid);
                }
            }
            ConsoleCommand::History { count } => {
                let events = self.controller.logger().get_recent_events(count);
                StatusDisplay::display_history(&events);
            }
            ConsoleCommand::Exit => {}
        }
        Ok(())
    }

    /// Console prompt reflecting the playback state
    async fn prompt(&self) -> &'static str {
        if self.controller.is_playing().await {
            "▶ "
        } else if self.controller.is_paused().await {
            "⏸ "
        } else {
            "> "
        }
    }

    /// Stop playback so no renderer outlives the process
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
        info!("Playback shut down");
    }

    fn handle_error(&self, error: &PlayerError) {
        log::log!(error.severity().log_level(), "{}", error);
        StatusDisplay::display_error(error);
    }

    /// Route Ctrl-C into a watch channel the front ends select on
    fn install_interrupt_handler() -> watch::Receiver<bool> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown_tx.send_replace(true);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
        shutdown_rx
    }
}

#[tokio::main]
async fn main() {
    let cli = CliApp::parse();

    let app = match AppController::new(cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    let code = match app.run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            StatusDisplay::display_simple_error(&e);
            app.shutdown().await;
            1
        }
    };

    info!("Application shutdown complete");
    // A blocked stdin read would otherwise keep the runtime alive.
    std::process::exit(code);
}
