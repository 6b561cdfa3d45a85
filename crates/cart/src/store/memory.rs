//! In-memory store, shared between clones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{CartStore, StorageError};

/// Process-local store.
///
/// Clones share the same map, so two repositories opened over clones of one
/// `MemoryStore` behave like two browser tabs over one storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the repository.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.into());
    }

    /// Raw bytes stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl CartStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.insert(key, bytes);
        Ok(())
    }
}
