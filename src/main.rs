use anyhow::Context as _;
use clap::Parser;
use doghub::api::start_http_server;
use doghub::config::{Config, ConfigOverrides};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Serve an image directory with a gallery of copyable links.
#[derive(Debug, Parser)]
#[command(name = "doghub", version, about)]
struct Cli {
    /// TOML config file (defaults to ./doghub.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve images from
    #[arg(short, long)]
    image_dir: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5000
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&ConfigOverrides {
        config_file: cli.config,
        image_dir: cli.image_dir,
        bind: cli.bind,
    })
    .context("failed to load configuration")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = start_http_server(config, shutdown_rx)
        .await
        .context("failed to start HTTP server")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");

    let _ = shutdown_tx.send(true);
    server.await.context("HTTP server task panicked")?;
    Ok(())
}
