//! Cache key and table types shared by every cache backend.
//!
//! - [`CacheKey`]: (fingerprint type, encoding) pair addressing one table
//! - [`EncodingTable`]: structure string → vector map for one key
//! - [`TableSet`]: working set of loaded tables with dirty tracking

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::types::{EncodedCompound, Encoding};

/// Address of one cache table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint_type: String,
    pub encoding: Encoding,
}

impl CacheKey {
    #[must_use]
    pub fn new(fingerprint_type: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            fingerprint_type: fingerprint_type.into(),
            encoding,
        }
    }

    /// File stem used by file-backed caches, e.g. `ecfp4_dense`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.fingerprint_type, self.encoding)
    }
}

/// Structure string → encoded vector for one [`CacheKey`].
///
/// Ordered so that serialized tables are byte-stable across runs.
pub type EncodingTable = BTreeMap<String, Vec<f32>>;

/// Outcome of an `update` call.
#[derive(Debug, Default)]
pub struct CacheUpdate {
    /// Structures encoded and stored (including overwrites).
    pub stored: usize,
    /// Structures the fingerprinter rejected, with the reason.
    pub failed: Vec<EncodingError>,
}

impl CacheUpdate {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Loaded tables plus the set of keys modified since the last flush.
#[derive(Debug, Default)]
pub struct TableSet {
    tables: HashMap<CacheKey, EncodingTable>,
    dirty: HashSet<CacheKey>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.tables.contains_key(key)
    }

    /// Install a table read from persistent storage. Replaces any loaded copy.
    pub fn install(&mut self, key: CacheKey, table: EncodingTable) {
        self.dirty.remove(&key);
        self.tables.insert(key, table);
    }

    pub fn table(&self, key: &CacheKey) -> Option<&EncodingTable> {
        self.tables.get(key)
    }

    /// Look up structures in a loaded table; `None` marks a miss.
    ///
    /// # Errors
    /// `CacheNotInitialized` if the table for `key` is not loaded.
    pub fn get(&self, key: &CacheKey, structures: &[String]) -> EncodingResult<Vec<Option<EncodedCompound>>> {
        let table = self
            .tables
            .get(key)
            .ok_or_else(|| EncodingError::not_initialized(&key.fingerprint_type, key.encoding))?;

        Ok(structures
            .iter()
            .map(|smiles| {
                table.get(smiles).map(|vector| EncodedCompound {
                    smiles: smiles.clone(),
                    fingerprint_type: key.fingerprint_type.clone(),
                    encoding: key.encoding,
                    vector: vector.clone(),
                })
            })
            .collect())
    }

    /// Encode `structures` and store them under the fingerprinter's key,
    /// creating the table if needed. Existing entries are overwritten.
    pub fn update(
        &mut self,
        structures: &[String],
        fingerprinter: &dyn Fingerprinter,
        encoding: Encoding,
    ) -> CacheUpdate {
        let key = CacheKey::new(fingerprinter.fingerprint_type(), encoding);
        let mut report = CacheUpdate::default();
        let results = fingerprinter.encode_batch(structures, encoding);
        let table = self.tables.entry(key.clone()).or_default();

        for result in results {
            match result {
                Ok(encoded) => {
                    table.insert(encoded.smiles, encoded.vector);
                    report.stored += 1;
                }
                Err(e) => {
                    warn!("Skipping structure during cache update: {}", e);
                    report.failed.push(e);
                }
            }
        }

        if report.stored > 0 {
            self.dirty.insert(key);
        }
        report
    }

    /// Keys modified since they were last flushed, with their tables.
    pub fn dirty_tables(&self) -> impl Iterator<Item = (&CacheKey, &EncodingTable)> {
        self.dirty
            .iter()
            .filter_map(|key| self.tables.get(key).map(|table| (key, table)))
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.dirty.clear();
    }

    /// Total entries across all loaded tables.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
