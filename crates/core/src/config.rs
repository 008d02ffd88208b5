//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user
//! config directory, then `NORDTRAIN_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::fuzzy;

/// Directory under the platform config dir holding our files.
pub const APP_DIR: &str = "nordtrain";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "NORDTRAIN";

const DEFAULT_CONFIG: &str = r#"# nordtrain configuration
#
# Every key can also be set through a NORDTRAIN_<KEY> environment variable.

# JSON file with the train collection. Leave unset to use the built-in dataset.
# seed_path = "/path/to/trains.json"

# Simulated loading delay in milliseconds.
mock_delay_ms = 300

# Minimum fuzzy score for a search hit (0.0 - 1.0).
fuzzy_threshold = 0.25

# tracing filter directive, e.g. "debug" or "nordtrain_core=trace".
log_level = "info"
"#;

/// Runtime settings shared by the core and the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Optional JSON seed file replacing the embedded dataset.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    /// Where favorite stations are persisted.
    pub favorites_path: PathBuf,
    /// Directory receiving CSV exports.
    pub export_dir: PathBuf,
    /// Simulated loading delay.
    pub mock_delay_ms: u64,
    /// Minimum fuzzy score counted as a search hit.
    pub fuzzy_threshold: f64,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = app_root();
        let settings = Config::builder()
            .set_default(
                "favorites_path",
                root.join("favorites.json").to_string_lossy().to_string(),
            )?
            .set_default(
                "export_dir",
                default_export_dir().to_string_lossy().to_string(),
            )?
            .set_default("mock_delay_ms", 300_i64)?
            .set_default("fuzzy_threshold", fuzzy::DEFAULT_THRESHOLD)?
            .set_default("log_level", "info")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.fuzzy_threshold = self.fuzzy_threshold.clamp(0.0, 1.0);
        self
    }
}

/// Root directory for configuration and persisted state.
pub fn app_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default configuration file path.
pub fn config_path() -> PathBuf {
    app_root().join("config.toml")
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write a commented default config file if none exists yet.
///
/// Returns `true` when a file was written. This runs before logging is set
/// up, so reporting is left to the caller.
pub fn ensure_default_config() -> Result<bool> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_without_file() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("missing.toml"))?;
        assert_eq!(config.mock_delay_ms, 300);
        assert_eq!(config.fuzzy_threshold, fuzzy::DEFAULT_THRESHOLD);
        assert!(config.seed_path.is_none());
        assert!(config.favorites_path.ends_with("favorites.json"));
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "seed_path = \"/tmp/trains.json\"\nmock_delay_ms = 0\nfuzzy_threshold = 3.0\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.seed_path, Some(PathBuf::from("/tmp/trains.json")));
        assert_eq!(config.mock_delay_ms, 0);
        assert_eq!(config.fuzzy_threshold, 1.0);
        Ok(())
    }

    #[test]
    fn default_file_is_loadable() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        assert!(write_default_config(path.clone())?);
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.log_level, "info");

        fs::write(&path, "mock_delay_ms = 5\n")?;
        assert!(!write_default_config(path.clone())?);
        assert_eq!(fs::read_to_string(&path)?, "mock_delay_ms = 5\n");
        Ok(())
    }
}
