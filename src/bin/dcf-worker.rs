//! # DCF Worker CLI
//!
//! Command-line interface for running a federated learning worker against a
//! coordinator: key generation, one-shot requests and the polling loop.

mod cli;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use dcf_worker::config::LoggingConfig;
use dcf_worker::{logging, WorkerConfig, WorkerResult};

use cli::{handle_config_command, handle_keygen_command, handle_worker_command};

#[derive(Parser, Debug)]
#[command(name = "dcf-worker")]
#[command(about = "Federated learning worker for the DCF coordinator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (default: ./dcf-worker.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a worker key pair (<path> and <path>.pub)
    Keygen {
        /// Private key output path
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    #[command(flatten)]
    Worker(WorkerCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Commands that register with the coordinator first
#[derive(Debug, Subcommand)]
pub enum WorkerCommands {
    /// Register with the coordinator and print the worker id
    Register,

    /// Register and print the current global model status
    Status,

    /// Register and download the current global model
    FetchModel {
        /// File to write the decompressed model to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Register and upload a model update from a file
    SubmitUpdate {
        /// File containing the serialized update
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Register and poll the coordinator until interrupted
    Run {
        /// Directory to store each new global model in
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write the effective configuration to a file
    Save {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> WorkerResult<()> {
    dispatch(Cli::parse()).await
}

async fn dispatch(cli: Cli) -> WorkerResult<()> {
    match cli.command {
        // Key generation is local and runs without any server configuration
        Commands::Keygen { path } => {
            logging::init_structured_logging(&LoggingConfig::default());
            handle_keygen_command(&path)
        }
        Commands::Config(config_cmd) => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            handle_config_command(config_cmd, &config)
        }
        Commands::Worker(worker_cmd) => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            handle_worker_command(worker_cmd, &config).await
        }
    }
}

fn load_config(config_path: Option<&Path>, verbose: u8) -> WorkerResult<WorkerConfig> {
    let mut config = match config_path {
        Some(config_path) => {
            let config = WorkerConfig::load_from_file(config_path)?;
            config.validate()?;
            config
        }
        None => WorkerConfig::load()?,
    };

    if let Some(level) = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    } {
        config.logging.level = Some(level.to_string());
    }
    logging::init_structured_logging(&config.logging);

    info!(
        server_url = %config.server_url(),
        authenticated = config.private_key_file.is_some(),
        "DCF worker starting"
    );
    Ok(config)
}
