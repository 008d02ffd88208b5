//! Initial train collection.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::info;

use crate::{config::AppConfig, models::Train, store::TrainStore};

/// Built-in dataset used when no seed file is configured.
pub const EMBEDDED_SEED: &str = include_str!("../data/trains.json");

/// Parse a JSON array of train records.
pub fn parse_trains(json: &str) -> Result<Vec<Train>> {
    serde_json::from_str(json).context("failed to parse train seed data")
}

/// Read a JSON seed file from disk.
pub fn read_trains(path: impl AsRef<Path>) -> Result<Vec<Train>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    parse_trains(&contents).with_context(|| format!("invalid seed file {}", path.display()))
}

/// Builds the [`TrainStore`] the dashboard starts from.
///
/// Loading waits for the configured delay first so the UI can show a
/// loading state the way a remote source would.
#[derive(Debug, Clone)]
pub struct TrainLoader {
    delay: Duration,
    seed_path: Option<PathBuf>,
}

impl TrainLoader {
    /// Loader configured from `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.mock_delay_ms),
            seed_path: config.seed_path.clone(),
        }
    }

    /// Loader for the embedded dataset with no delay.
    pub fn embedded() -> Self {
        Self {
            delay: Duration::ZERO,
            seed_path: None,
        }
    }

    /// Read a seed file instead of the embedded dataset.
    pub fn with_seed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_path = Some(path.into());
        self
    }

    /// Wait out the delay, then build the store.
    pub async fn load(&self) -> Result<TrainStore> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let trains = match &self.seed_path {
            Some(path) => read_trains(path)?,
            None => parse_trains(EMBEDDED_SEED)?,
        };
        let total = trains.len();
        let store = TrainStore::new(trains).context("seed data is inconsistent")?;
        info!(
            total,
            source = self
                .seed_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "embedded".to_string()),
            "Trains loaded"
        );
        Ok(store)
    }
}
