//! Favorite stations persisted as a JSON array.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Country;

/// A station the user pinned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteStation {
    /// Stable station key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Country the station belongs to.
    pub country: Country,
}

impl FavoriteStation {
    /// Favorite for a station known only by name, keyed by its slug.
    pub fn from_name(name: &str, country: Country) -> Self {
        Self {
            id: station_slug(name),
            name: name.trim().to_string(),
            country,
        }
    }

    fn key_matches(&self, id: &str, country: Country) -> bool {
        self.id == id && self.country == country
    }
}

/// Lower-case, dash-separated key for a station name.
pub fn station_slug(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// File-backed favorites keyed by `(id, country)`.
///
/// The whole list is rewritten after every change.
#[derive(Debug)]
pub struct FavoriteStore {
    path: PathBuf,
    stations: Vec<FavoriteStation>,
}

impl FavoriteStore {
    /// Load favorites from `path`; a missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stations = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read favorites {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse favorites {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, stations })
    }

    /// File backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Favorites in insertion order.
    pub fn stations(&self) -> &[FavoriteStation] {
        &self.stations
    }

    /// Whether `(id, country)` is a favorite.
    pub fn is_favorite(&self, id: &str, country: Country) -> bool {
        self.stations
            .iter()
            .any(|station| station.key_matches(id, country))
    }

    /// Add `station`; returns `false` if it was already present.
    pub fn add(&mut self, station: FavoriteStation) -> Result<bool> {
        if self.is_favorite(&station.id, station.country) {
            return Ok(false);
        }
        debug!(station = %station.id, country = %station.country, "Adding favorite");
        self.stations.push(station);
        self.persist()?;
        Ok(true)
    }

    /// Remove `(id, country)`; returns `false` if it was not present.
    pub fn remove(&mut self, id: &str, country: Country) -> Result<bool> {
        let before = self.stations.len();
        self.stations
            .retain(|station| !station.key_matches(id, country));
        if self.stations.len() == before {
            return Ok(false);
        }
        debug!(station = %id, %country, "Removed favorite");
        self.persist()?;
        Ok(true)
    }

    /// Flip membership of `station`, returning whether it is now a favorite.
    pub fn toggle(&mut self, station: FavoriteStation) -> Result<bool> {
        if self.is_favorite(&station.id, station.country) {
            self.remove(&station.id, station.country)?;
            Ok(false)
        } else {
            self.add(station)
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create favorites directory {}", parent.display())
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(&self.stations).context("failed to serialize favorites")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write favorites {}", self.path.display()))
    }
}
