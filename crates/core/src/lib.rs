#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Nordic train board.
//!
//! This crate hosts the train model, fuzzy search, the filter/sort
//! pipeline, batch editing, the in-memory store, favorites, CSV export
//! and configuration used by the terminal dashboard.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod favorites;
pub mod filter;
pub mod fuzzy;
pub mod models;
pub mod seed;
pub mod store;

pub use batch::{batch_update, BatchOutcome, BatchReport, EditableField};
pub use config::AppConfig;
pub use error::{StoreError, UpdateError};
pub use favorites::{FavoriteStation, FavoriteStore};
pub use filter::{
    filter_trains, FilterParams, SearchColumns, SortDirection, StatusFilter, TrainField,
};
pub use models::{Country, Train};
pub use seed::TrainLoader;
pub use store::{ChangeRecord, StoreStats, TrainStore};
