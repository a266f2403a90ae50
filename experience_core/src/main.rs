//! Experience manager binary.
//!
//! Configuration comes from an optional TOML file (`--config`), with
//! `--base-url` and `--seed` taking precedence. Log output is controlled by
//! `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::Parser;
use experience_core::{ExperienceManager, HttpPlatformClient, ManagerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drives encounters for an interactive narrative platform.
#[derive(Parser, Debug)]
#[command(name = "experience-manager")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Platform base address (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Fixed seed for tie-breaking between encounters
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ManagerConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    info!("starting experience manager");
    let client = HttpPlatformClient::from_config(&config)?;
    let mut manager = ExperienceManager::start(client, config)?;
    manager.run()?;
    Ok(())
}
