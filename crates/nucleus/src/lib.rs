//! # Nucleus Console Host - Main Entry Point
//!
//! Hosts the Nucleus framework services (zone tracking, jail, plugin commands)
//! on a simulated world driven from the console. This entry point handles CLI
//! parsing, configuration loading and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! nucleus
//!
//! # Specify custom configuration
//! nucleus --config prison.toml
//!
//! # Faster ticks and verbose logs
//! nucleus --tick-ms 10 --log-level debug
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `nucleus.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Console
//!
//! See [`console`] for the accepted lines. Anything that is not a host
//! keyword is dispatched as a plugin command from the console.
//!
//! ## Signal Handling
//!
//! The host shuts down gracefully on SIGINT (Ctrl+C) or SIGTERM. A second
//! signal exits immediately.

use tracing::error;

pub mod app;
mod cli;
mod config;
pub mod console;
mod logging;
mod signals;

use cli::CliArgs;

pub use app::Application;

pub use config::{AppConfig, ConfigError, LoggingSettings, ServerSettings, ZoneSettings};

/// Main entry point for the console host.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from `main` inside the tokio runtime.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, before the application exists
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    let mut logging = config.logging;
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {e:?}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
