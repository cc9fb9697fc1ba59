use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::Value;
use tracing::info;

use videoshare_auth_core::{AuthPayload, Config, CredentialStore, Storage};

/// Commands that work on the stored token and user
#[derive(Subcommand, Debug, PartialEq)]
pub enum StoreCommand {
    /// Save a login payload ({"access_token", "user"}) as JSON
    Save {
        /// File to read the payload from, or "-" for stdin
        #[arg(long, default_value = "-")]
        payload: PathBuf,
    },
    /// Print the stored token
    Token,
    /// Print the stored user as JSON
    User,
    /// Print the Authorization header value
    Header,
    /// Remove the stored token and user
    Logout,
    /// Show who is logged in
    Status,
}

/// Whether the command found what it was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Missing,
}

pub fn execute<S: Storage>(
    command: &StoreCommand,
    store: &CredentialStore<S>,
    input: &mut impl Read,
    out: &mut impl Write,
) -> Result<Outcome> {
    match command {
        StoreCommand::Save { payload } => {
            let raw = if payload.as_path() == Path::new("-") {
                let mut raw = String::new();
                input
                    .read_to_string(&mut raw)
                    .context("Failed to read payload from stdin")?;
                raw
            } else {
                std::fs::read_to_string(payload)
                    .with_context(|| format!("Failed to read payload file {}", payload.display()))?
            };

            // The user is stored as given, whatever its shape
            let payload: AuthPayload<Value> =
                serde_json::from_str(&raw).context("Payload is not a login response")?;
            store.save(&payload).context("Failed to save credentials")?;
            info!("Credentials saved");
            Ok(Outcome::Done)
        }
        StoreCommand::Token => print_or_missing(out, store.token()?),
        StoreCommand::Header => print_or_missing(out, store.authorization_header()?),
        StoreCommand::User => {
            let user = store
                .current_user::<Value>()?
                .map(|u| serde_json::to_string_pretty(&u))
                .transpose()?;
            print_or_missing(out, user)
        }
        StoreCommand::Logout => {
            store.logout().context("Failed to clear credentials")?;
            info!("Logged out");
            Ok(Outcome::Done)
        }
        StoreCommand::Status => {
            if !store.is_authenticated()? {
                writeln!(out, "Not logged in")?;
                return Ok(Outcome::Missing);
            }
            match store.user()? {
                Some(user) => writeln!(out, "Logged in as {}", user.display_name())?,
                None => writeln!(out, "Logged in")?,
            }
            Ok(Outcome::Done)
        }
    }
}

/// Write the effective settings to `path`
pub fn write_config(config: &Config, path: &Path, out: &mut impl Write) -> Result<Outcome> {
    config.save_to(path)?;
    info!(path = %path.display(), "Config written");
    writeln!(out, "{}", path.display())?;
    Ok(Outcome::Done)
}

fn print_or_missing(out: &mut impl Write, value: Option<String>) -> Result<Outcome> {
    match value {
        Some(value) => {
            writeln!(out, "{}", value)?;
            Ok(Outcome::Done)
        }
        None => Ok(Outcome::Missing),
    }
}
