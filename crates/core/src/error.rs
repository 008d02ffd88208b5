//! Typed errors for store and update operations.

use thiserror::Error;

/// Failure to build a [`TrainStore`](crate::store::TrainStore).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Two records share an id.
    #[error("duplicate train id '{0}'")]
    DuplicateId(String),
}

/// Failure to apply a single-record update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// No record carries the id.
    #[error("train '{0}' not found")]
    NotFound(String),
    /// The value cannot be stored in the field.
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        /// Field being written.
        field: &'static str,
        /// Rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The updater rejected the record.
    #[error("update rejected: {0}")]
    Rejected(String),
    /// The updater panicked.
    #[error("updater panicked: {0}")]
    Panicked(String),
}
