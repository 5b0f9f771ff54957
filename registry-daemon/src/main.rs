//! 'main' for the registry daemon.

mod commands;
mod eventlog;
mod settings;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use registry_common::RegistryConfig;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter, fmt, EnvFilter, Registry};

use settings::DaemonSettings;

#[derive(Debug, Parser)]
#[command(name = "registry-daemon")]
struct Args {
    #[arg(long, value_name = "PATH", default_value = "registry.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Continuous snapshot publish.
    Run,
    /// One-shot reward integration over a height range.
    Distribute {
        /// Do actual batch transfer preparation.
        #[arg(short, long)]
        act: bool,
        /// Route publishing to the testnet endpoint and mark the post as a simulation.
        #[arg(short, long, conflicts_with = "act")]
        testnet: bool,
        #[arg(long, value_name = "HEIGHT")]
        start_height: Option<u64>,
        #[arg(long, value_name = "HEIGHT")]
        end_height: Option<u64>,
        #[arg(long, value_name = "ADDRESS")]
        reward_sender: Option<String>,
    },
}

fn setup_logging() {
    let fmt_layer = fmt::layer()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_filter(filter::filter_fn(|meta| meta.is_event()));
    Registry::default().with(fmt_layer).init();
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging();

    info!("registry-daemon starting");

    let config = Arc::new(
        Config::builder()
            .add_source(File::with_name(&args.config).required(false))
            .add_source(Environment::with_prefix("REGISTRY").separator("__"))
            .build()?,
    );

    let registry_config = RegistryConfig::from_config(&config)?;
    let daemon_settings = DaemonSettings::from_config(&config)?;

    match args.command {
        Command::Run => commands::run(&registry_config, &daemon_settings).await?,
        Command::Distribute { act, testnet, start_height, end_height, reward_sender } => {
            commands::distribute(&registry_config, &daemon_settings, act, testnet, start_height, end_height, reward_sender).await?
        }
    }

    info!("registry-daemon exiting");
    Ok(())
}
