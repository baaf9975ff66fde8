//! Reference host binary.
//!
//! Loads a model file and serves the data and command planes on loopback
//! until interrupted. `appmodel.saveModel` writes back to the same file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appmodel_bridge::config::{DEFAULT_COMMAND_PORT, DEFAULT_DATA_PORT, DEFAULT_HOST};
use appmodel_bridge::host::{bind_loopback, DocumentStore, HostOptions, HostState};

#[derive(Parser, Debug)]
#[command(name = "appmodel_host")]
#[command(about = "Serve an application model over the loopback bridge")]
struct Args {
    /// Model file (JSON)
    model: PathBuf,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "APPMODEL_DATA_PORT", default_value_t = DEFAULT_DATA_PORT)]
    data_port: u16,

    #[arg(long, env = "APPMODEL_COMMAND_PORT", default_value_t = DEFAULT_COMMAND_PORT)]
    command_port: u16,

    /// Start with a logged-in session
    #[arg(long)]
    logged_in: bool,

    /// Delay auth-status answers (milliseconds)
    #[arg(long)]
    auth_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    let store = DocumentStore::load(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;
    let options = HostOptions {
        logged_in: args.logged_in,
        auth_delay_ms: args.auth_delay_ms,
    };
    let state = HostState::new(store, &options);

    let mut handle = bind_loopback(state, &args.host, args.data_port, args.command_port).await?;
    println!(
        "Host listening: data-plane http://{} command-plane http://{}",
        handle.data_addr, handle.command_addr
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown();
    Ok(())
}
