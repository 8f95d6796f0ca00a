//! # storefrontctl
//!
//! Operator CLI for the storefront image catalog: audits gallery ordering,
//! repairs it, and runs the schema maintenance that goes with it.

mod cli;
mod commands;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_config::{ConfigLoader, ConfigLoaderOptions};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,storefront_core=info,sqlx=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let load = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    for warning in load.warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }
    if load.config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = load.config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "using configuration file");
    }

    commands::run(cli.command, &load.config).await
}
