//! In-process encoding cache.
//!
//! The "persistent" store is a map behind an `Arc`, shared between every cache
//! created through [`InMemoryEncodingCache::with_store`]. It outlives `clear`,
//! so it behaves like a durable backend inside one process.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::types::{CacheKey, CacheUpdate, EncodingTable, TableSet};
use super::EncodingCache;
use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::types::{EncodedCompound, Encoding};

/// Store shared by in-memory caches.
pub type SharedStore = Arc<RwLock<HashMap<CacheKey, EncodingTable>>>;

#[derive(Debug, Default)]
pub struct InMemoryEncodingCache {
    store: SharedStore,
    tables: TableSet,
}

impl InMemoryEncodingCache {
    /// Create a cache with a fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache over an existing store.
    pub fn with_store(store: SharedStore) -> Self {
        Self {
            store,
            tables: TableSet::new(),
        }
    }

    /// Handle to the backing store.
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }
}

impl EncodingCache for InMemoryEncodingCache {
    fn load(&mut self, fingerprint_type: &str, encoding: Encoding) -> EncodingResult<()> {
        let key = CacheKey::new(fingerprint_type, encoding);
        let table = self
            .store
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| EncodingError::not_initialized(fingerprint_type, encoding))?;

        debug!("Loaded {} cached encodings for {}", table.len(), key.file_stem());
        self.tables.install(key, table);
        Ok(())
    }

    fn get(
        &self,
        structures: &[String],
        fingerprint_type: &str,
        encoding: Encoding,
    ) -> EncodingResult<Vec<Option<EncodedCompound>>> {
        self.tables
            .get(&CacheKey::new(fingerprint_type, encoding), structures)
    }

    fn update(
        &mut self,
        structures: &[String],
        fingerprinter: &dyn Fingerprinter,
        encoding: Encoding,
    ) -> EncodingResult<CacheUpdate> {
        let key = CacheKey::new(fingerprinter.fingerprint_type(), encoding);
        if !self.tables.contains_key(&key) {
            // Merge into what was already persisted rather than shadowing it.
            if let Some(existing) = self.store.read().get(&key).cloned() {
                self.tables.install(key, existing);
            }
        }
        Ok(self.tables.update(structures, fingerprinter, encoding))
    }

    fn write(&mut self) -> EncodingResult<()> {
        let mut store = self.store.write();
        for (key, table) in self.tables.dirty_tables() {
            store.insert(key.clone(), table.clone());
        }
        drop(store);
        self.tables.mark_clean();
        Ok(())
    }

    fn clear(&mut self) {
        self.tables.clear();
    }

    fn is_loaded(&self, fingerprint_type: &str, encoding: Encoding) -> bool {
        self.tables
            .contains_key(&CacheKey::new(fingerprint_type, encoding))
    }

    fn len(&self) -> usize {
        self.tables.len()
    }
}
