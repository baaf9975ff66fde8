//! Application-model MCP server binary.
//!
//! Speaks JSON-RPC on stdin/stdout and reaches the host over the loopback
//! bridge. Logs go to stderr so they never mix with protocol traffic.
//!
//! ## Usage
//!
//! ```bash
//! APPMODEL_DATA_PORT=3001 ./target/debug/appmodel_mcp
//! ```
//!
//! ## Environment Variables
//!
//! - `APPMODEL_BRIDGE_CONFIG` (optional): YAML file with host, ports and timeouts
//! - `APPMODEL_BRIDGE_HOST`, `APPMODEL_DATA_PORT`, `APPMODEL_COMMAND_PORT` (optional): overrides
//! - `RUST_LOG` (optional): log filter, default `info,appmodel_bridge=debug`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appmodel_bridge::catalog::Catalogs;
use appmodel_bridge::mcp::McpServer;
use appmodel_bridge::{BridgeConfig, HttpBridge, Toolbox};

#[derive(Parser, Debug)]
#[command(name = "appmodel_mcp")]
#[command(about = "MCP tools for editing an application model held by a loopback host")]
struct Args {
    /// Bridge configuration file (YAML)
    #[arg(long, env = "APPMODEL_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Data-plane port, overriding the configuration
    #[arg(long)]
    data_port: Option<u16>,

    /// Command-plane port, overriding the configuration
    #[arg(long)]
    command_port: Option<u16>,

    /// Directory of family catalogs to use instead of the built-in ones
    #[arg(long)]
    catalog_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,appmodel_bridge=debug")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?
            .with_overrides(|var| std::env::var(var).ok())?,
        None => BridgeConfig::load()?,
    };
    if let Some(port) = args.data_port {
        config.data_port = port;
    }
    if let Some(port) = args.command_port {
        config.command_port = port;
    }
    tracing::info!(
        host = %config.host,
        data_port = config.data_port,
        command_port = config.command_port,
        "bridge configured"
    );

    let catalogs = match &args.catalog_dir {
        Some(dir) => Arc::new(
            Catalogs::from_dir(dir)
                .with_context(|| format!("loading catalogs from {}", dir.display()))?,
        ),
        None => Catalogs::builtin()?,
    };

    let bridge = Arc::new(HttpBridge::new(config)?);
    let toolbox = Toolbox::new(bridge, &catalogs)?;
    McpServer::new(toolbox).run().await
}
