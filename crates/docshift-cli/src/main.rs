//! docshift command-line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use docshift::{
    ServiceConfig,
    convert::Collaborators,
    storage::{StorageLayout, sweep_stale},
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "docshift=info,tower_http=info";

#[derive(Parser)]
#[command(name = "docshift")]
#[command(version, about = "File conversion and media download service", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Configuration file (default: discover docshift.toml upwards from the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory the storage roots are created under
        #[arg(short, long)]
        storage_dir: Option<PathBuf>,

        /// Send error bodies with HTTP 200, for clients that only inspect the body
        #[arg(long)]
        legacy_errors: bool,
    },

    /// Remove stale artifacts from the storage roots and exit
    Sweep {
        /// Configuration file (default: discover docshift.toml upwards from the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the storage roots live under
        #[arg(short, long)]
        storage_dir: Option<PathBuf>,

        /// Minimum age in seconds of entries to remove
        #[arg(short = 'a', long)]
        max_age: Option<u64>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) => ServiceConfig::from_toml_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => match ServiceConfig::discover().context("Failed to discover configuration")? {
            Some(config) => {
                tracing::info!("Loaded configuration from discovered docshift.toml");
                config
            }
            None => ServiceConfig::default(),
        },
    };
    config.apply_env_overrides();
    Ok(config)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => tracing::warn!("Cannot listen for Ctrl-C, running until killed: {}", e),
    }
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_LOG_FILTER,
        1 => "docshift=debug,tower_http=debug",
        _ => "docshift=trace,tower_http=trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose))))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            storage_dir,
            legacy_errors,
        } => {
            let mut config = load_config(config)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = storage_dir {
                config.storage.base_dir = dir;
            }
            if legacy_errors {
                config.server.legacy_error_status = true;
            }

            let collaborators = Collaborators::system(&config);
            docshift::api::serve_with_shutdown(config, collaborators, shutdown_signal())
                .await
                .context("Server failed")?;
            Ok(())
        }

        Commands::Sweep {
            config,
            storage_dir,
            max_age,
        } => {
            let mut config = load_config(config)?;
            if let Some(dir) = storage_dir {
                config.storage.base_dir = dir;
            }
            if let Some(secs) = max_age {
                config.storage.sweep_max_age_secs = secs;
            }

            let layout = StorageLayout::from_config(&config.storage);
            let report = sweep_stale(&layout, config.storage.sweep_max_age());
            println!("Removed {} stale artifact(s), {} failed", report.removed, report.failed);
            if report.failed > 0 {
                anyhow::bail!("{} stale artifact(s) could not be removed", report.failed);
            }
            Ok(())
        }
    }
}
