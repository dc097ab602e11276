//! Aperture - asynchronous image upload and processing service.
//!
//! Aperture accepts image uploads over HTTP, validates them, and processes
//! each one in the background: dimensions, EXIF metadata, two thumbnail
//! presets, and an optional generated caption. Clients poll records and
//! fetch thumbnails by id.
//!
//! # Usage
//!
//! ```bash
//! # Run the server with the configured bind address
//! aperture serve
//!
//! # Run on a specific address
//! aperture serve --bind 0.0.0.0:9000
//!
//! # View configuration
//! aperture config show
//! aperture config path
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod logging;
mod server;

/// Aperture - asynchronous image upload and processing service.
#[derive(Parser, Debug)]
#[command(name = "aperture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to a config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(server::ServeArgs),

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => aperture_core::Config::load_from(path)?,
        None => match aperture_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `aperture config path`."
                );
                aperture_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Aperture v{}", aperture_core::VERSION);

    match cli.command {
        Commands::Serve(args) => server::execute(args, config).await,
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => println!("{}", config.to_toml()?),
                ConfigAction::Path => {
                    let path = cli
                        .config
                        .unwrap_or_else(aperture_core::Config::default_path);
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
    }
}
