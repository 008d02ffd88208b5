mod app;
mod input;

use std::{fs, sync::Mutex};

use anyhow::{Context, Result};
use nordtrain_core::{
    config::{self, AppConfig},
    FavoriteStore, TrainLoader,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let wrote_default = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;

    let config_path = config::config_path();
    if wrote_default {
        info!(path = %config_path.display(), "Wrote default configuration");
    }
    info!(path = %config_path.display(), "Configuration loaded");

    println!("Loading trains…");
    let store = TrainLoader::new(&config).load().await?;
    let favorites = FavoriteStore::load(config.favorites_path.clone())?;

    let mut app = app::DashboardApp::new(store, favorites, config);
    app.run().await
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("nordtrain.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    // stdout belongs to the terminal UI, so only the file layer is installed.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
