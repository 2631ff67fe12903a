//! Encoding cache: avoids recomputing compound encodings.
//!
//! # Architecture
//!
//! ```text
//! EncodingCache (trait)
//! ├── load(fp_type, encoding)             // CacheNotInitialized if never persisted
//! ├── get(structures, fp_type, encoding)  // Option per structure, None = miss
//! ├── update(structures, fingerprinter)   // encode + overwrite
//! ├── write()                             // flush dirty tables
//! └── clear()                             // drop in-memory tables only
//!
//! InMemoryEncodingCache   // persistent store is a shared in-process map
//! FileEncodingCache       // one bincode file per (fp_type, encoding)
//! ```
//!
//! Backends do no internal locking: mutation takes `&mut self`, so callers that
//! share a cache must serialize `update` themselves (see
//! [`CachingFingerprinter`](crate::caching::CachingFingerprinter)).

mod file;
mod memory;
mod types;

pub use file::FileEncodingCache;
pub use memory::{InMemoryEncodingCache, SharedStore};
pub use types::{CacheKey, CacheUpdate, EncodingTable, TableSet};

use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::types::{EncodedCompound, Encoding};

/// Capability interface for encoding caches.
pub trait EncodingCache: Send + Sync {
    /// Load the persisted table for a (fingerprint type, encoding) pair.
    ///
    /// # Errors
    /// `CacheNotInitialized` if nothing was ever written for the pair. No
    /// empty table is created in that case.
    fn load(&mut self, fingerprint_type: &str, encoding: Encoding) -> EncodingResult<()>;

    /// Cached encodings for `structures`, one slot per input, `None` on miss.
    ///
    /// # Errors
    /// `CacheNotInitialized` if the pair's table is not loaded.
    fn get(
        &self,
        structures: &[String],
        fingerprint_type: &str,
        encoding: Encoding,
    ) -> EncodingResult<Vec<Option<EncodedCompound>>>;

    /// Single-structure lookup.
    ///
    /// # Errors
    /// `CacheMiss` if the structure is absent, `CacheNotInitialized` if the
    /// table is not loaded.
    fn get_one(
        &self,
        smiles: &str,
        fingerprint_type: &str,
        encoding: Encoding,
    ) -> EncodingResult<EncodedCompound> {
        self.get(&[smiles.to_string()], fingerprint_type, encoding)?
            .pop()
            .flatten()
            .ok_or_else(|| EncodingError::CacheMiss {
                smiles: smiles.to_string(),
            })
    }

    /// Encode `structures` with `fingerprinter` and store them, overwriting
    /// existing entries for the same key.
    fn update(
        &mut self,
        structures: &[String],
        fingerprinter: &dyn Fingerprinter,
        encoding: Encoding,
    ) -> EncodingResult<CacheUpdate>;

    /// Flush in-memory changes to persistent storage.
    fn write(&mut self) -> EncodingResult<()>;

    /// Empty the in-memory cache. Persistent storage is not touched.
    fn clear(&mut self);

    /// Whether the pair's table is currently loaded.
    fn is_loaded(&self, fingerprint_type: &str, encoding: Encoding) -> bool;

    /// Total in-memory entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
