//! Persistent store adapters.
//!
//! The cart is persisted as a single opaque byte record under a namespaced
//! key. Adapters only move bytes; decoding and corruption recovery live in
//! [`crate::payload`] and [`crate::repository`].
//!
//! - [`MemoryStore`] - process-local map, shared between clones
//! - [`FileStore`] - one file per key in a directory, atomic per save

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a store adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// The key cannot be mapped to a storage location.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    /// The record could not be serialized.
    #[error("failed to encode record for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// The store refused the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value byte storage that outlives a single session.
///
/// A single `save` is atomic; nothing spans more than one call.
pub trait CartStore: Send + Sync {
    /// Read the bytes stored under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record exists but cannot be read.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails. The previous value is
    /// left in place.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

impl<S: CartStore + ?Sized> CartStore for std::sync::Arc<S> {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).save(key, bytes)
    }
}
