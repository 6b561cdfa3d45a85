//! Crate-level error type.
//!
//! Cart operations report expected outcomes (`AlreadyPresent`, `NotFound`,
//! `Rejected`) as ordinary values. `CartError` covers the failures a caller
//! may want to propagate with `?`: bad catalog input, storage, payload, and
//! configuration problems.

use thiserror::Error;

use recipe_box_core::InvalidRecord;

use crate::config::ConfigError;
use crate::payload::PayloadError;
use crate::store::StorageError;

/// Application-level error type for the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Catalog record could not be normalized.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] InvalidRecord),

    /// Persistent store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored payload could not be decoded.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog input was not valid JSON.
    #[error("Catalog JSON error: {0}")]
    CatalogJson(#[from] serde_json::Error),

    /// Input could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
