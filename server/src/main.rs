use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use pantry_core::Config;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// TOML config file
    #[arg(long, env = "PANTRY_CONFIG")]
    config: Option<PathBuf>,
    /// Database directory, overrides `store_path` from the config
    #[arg(long, env = "PANTRY_DB")]
    db: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("loading config")?;
    let db_path = args.db.clone().unwrap_or_else(|| config.store_path.clone());
    let app: Router = build_app(&db_path, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
