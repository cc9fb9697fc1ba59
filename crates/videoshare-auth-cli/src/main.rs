//! vs-auth - inspect and manage the stored VideoShare login.
//!
//! Saves the token and user returned by a login, prints them back for
//! scripts, and clears them on logout.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use videoshare_auth_core::{Config, CredentialStore, StorageBackend};

use commands::{Outcome, StoreCommand};

/// Manage the stored VideoShare token and user
#[derive(Parser, Debug)]
#[command(name = "vs-auth", version)]
#[command(about = "Manage the stored VideoShare token and user", long_about = None)]
struct Cli {
    /// Storage backend (file, keyring); overrides the config file
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,

    /// Directory for the file backend
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Keychain service name for the keyring backend
    #[arg(long, global = true)]
    service: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Write the effective backend settings to the config file
    Config,

    #[command(flatten)]
    Store(StoreCommand),
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(ref dir) = self.storage_dir {
            config.storage_dir = Some(dir.clone());
        }
        if let Some(ref service) = self.service {
            config.keyring_service = Some(service.clone());
        }
        Ok(config)
    }

    fn config_path(&self) -> Result<PathBuf> {
        match self.config {
            Some(ref path) => Ok(path.clone()),
            None => Config::config_path(),
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Missing) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let config = cli.config()?;
    let stdout = io::stdout();

    match cli.command {
        Command::Config => commands::write_config(&config, &cli.config_path()?, &mut stdout.lock()),
        Command::Store(ref command) => {
            debug!(backend = %config.backend, "Opening storage");
            let store = CredentialStore::new(config.open_storage()?);
            let stdin = io::stdin();
            commands::execute(command, &store, &mut stdin.lock(), &mut stdout.lock())
        }
    }
}
