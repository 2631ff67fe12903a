//! Fingerprinter wrapper that consults an [`EncodingCache`] before encoding.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::EncodingCache;
use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::types::{EncodedCompound, Encoding};

/// Cache shared between a writable fingerprinter and its frozen views.
pub type SharedCache = Arc<RwLock<Box<dyn EncodingCache>>>;

/// Fingerprinter that serves encodings from a cache and fills it on miss.
///
/// Cache mutation is serialized behind the write lock. The [`frozen`] view
/// never writes, so it is safe to hand to scoring workers.
///
/// [`frozen`]: CachingFingerprinter::frozen
#[derive(Clone)]
pub struct CachingFingerprinter {
    inner: Arc<dyn Fingerprinter>,
    cache: SharedCache,
    read_only: bool,
}

impl CachingFingerprinter {
    pub fn new(inner: Arc<dyn Fingerprinter>, cache: Box<dyn EncodingCache>) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(cache)),
            read_only: false,
        }
    }

    /// Load persisted tables for every encoding scheme, ignoring pairs that
    /// were never written.
    ///
    /// # Errors
    /// Any load error other than `CacheNotInitialized` (corrupt file, IO).
    pub fn warm(&self) -> EncodingResult<()> {
        let mut cache = self.cache.write();
        for encoding in Encoding::all() {
            match cache.load(self.inner.fingerprint_type(), encoding) {
                Ok(()) | Err(EncodingError::CacheNotInitialized { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read-only view sharing the same cache. Misses are encoded but not stored.
    pub fn frozen(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cache: Arc::clone(&self.cache),
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    /// Flush the cache to persistent storage.
    ///
    /// # Errors
    /// `InvalidInput` on a frozen view, otherwise whatever the backend reports.
    pub fn flush(&self) -> EncodingResult<()> {
        if self.read_only {
            return Err(EncodingError::InvalidInput(
                "cannot flush a read-only fingerprinter".to_string(),
            ));
        }
        self.cache.write().write()
    }

    fn cached(&self, smiles: &str, encoding: Encoding) -> Option<EncodedCompound> {
        self.cache
            .read()
            .get_one(smiles, self.inner.fingerprint_type(), encoding)
            .ok()
            .filter(|hit| self.fits(hit))
    }

    /// Entries whose length differs from the wrapped fingerprinter's are stale.
    fn fits(&self, hit: &EncodedCompound) -> bool {
        let expected = self.inner.dimension();
        if hit.dimension() == expected {
            return true;
        }
        warn!(
            "Ignoring cached '{}': length {} but {} expects {}",
            hit.smiles,
            hit.dimension(),
            self.inner.fingerprint_type(),
            expected
        );
        false
    }
}

impl std::fmt::Debug for CachingFingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingFingerprinter")
            .field("fingerprint_type", &self.inner.fingerprint_type())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl Fingerprinter for CachingFingerprinter {
    fn fingerprint_type(&self) -> &str {
        self.inner.fingerprint_type()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn encode(&self, smiles: &str, encoding: Encoding) -> EncodingResult<EncodedCompound> {
        if let Some(hit) = self.cached(smiles, encoding) {
            return Ok(hit);
        }
        if self.read_only {
            return self.inner.encode(smiles, encoding);
        }

        debug!("Cache miss for '{}', encoding", smiles);
        let mut cache = self.cache.write();
        let report = cache.update(&[smiles.to_string()], self.inner.as_ref(), encoding)?;
        if let Some(e) = report.failed.into_iter().next() {
            return Err(e);
        }
        cache.get_one(smiles, self.inner.fingerprint_type(), encoding)
    }

    fn encode_batch(
        &self,
        smiles: &[String],
        encoding: Encoding,
    ) -> Vec<EncodingResult<EncodedCompound>> {
        let hits = self
            .cache
            .read()
            .get(smiles, self.inner.fingerprint_type(), encoding)
            .unwrap_or_else(|_| vec![None; smiles.len()])
            .into_iter()
            .map(|hit| hit.filter(|h| self.fits(h)))
            .collect::<Vec<_>>();

        let misses: Vec<String> = smiles
            .iter()
            .zip(&hits)
            .filter(|(_, hit)| hit.is_none())
            .map(|(s, _)| s.clone())
            .collect();

        if !misses.is_empty() && !self.read_only {
            let mut cache = self.cache.write();
            if let Err(e) = cache.update(&misses, self.inner.as_ref(), encoding) {
                warn!("Cache update failed, encoding without cache: {}", e);
            }
        }

        smiles
            .iter()
            .zip(hits)
            .map(|(s, hit)| match hit {
                Some(encoded) => Ok(encoded),
                None => self
                    .cached(s, encoding)
                    .map_or_else(|| self.inner.encode(s, encoding), Ok),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryEncodingCache;
    use crate::hashed::HashedSmilesFingerprinter;

    fn create_test_fingerprinter() -> CachingFingerprinter {
        let inner = Arc::new(HashedSmilesFingerprinter::new(64, 2).unwrap());
        CachingFingerprinter::new(inner, Box::new(InMemoryEncodingCache::new()))
    }

    #[test]
    fn test_miss_fills_cache() {
        let fp = create_test_fingerprinter();
        assert_eq!(fp.cache().read().len(), 0);

        let first = fp.encode("CCO", Encoding::Dense).unwrap();
        assert_eq!(fp.cache().read().len(), 1);
        let second = fp.encode("CCO", Encoding::Dense).unwrap();
        assert_eq!(first, second);
        println!("[PASS] miss stored, second call served from cache");
    }

    #[test]
    fn test_frozen_never_writes() {
        let fp = create_test_fingerprinter();
        let frozen = fp.frozen();

        let encoded = frozen.encode("c1ccccc1", Encoding::BitArray).unwrap();
        assert_eq!(encoded.dimension(), 64);
        assert_eq!(fp.cache().read().len(), 0);
        assert!(frozen.flush().is_err());
    }

    #[test]
    fn test_unencodable_is_reported() {
        let fp = create_test_fingerprinter();
        let err = fp.encode("C1CC", Encoding::Dense).unwrap_err();
        assert!(matches!(err, EncodingError::UnencodableStructure { .. }));
    }

    #[test]
    fn test_batch_mixes_hits_misses_and_failures() {
        let fp = create_test_fingerprinter();
        fp.encode("CCO", Encoding::Dense).unwrap();

        let input = vec!["CCO".to_string(), "CCN".to_string(), "C(C".to_string()];
        let results = fp.encode_batch(&input, Encoding::Dense);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(fp.cache().read().len(), 2);
    }

    /// Reports the 64-wide type while producing 32-wide vectors.
    struct Mislabeled(HashedSmilesFingerprinter);

    impl Fingerprinter for Mislabeled {
        fn fingerprint_type(&self) -> &str {
            "smiles-hash-d64-r2"
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        fn encode(&self, smiles: &str, encoding: Encoding) -> EncodingResult<EncodedCompound> {
            self.0.encode(smiles, encoding)
        }
    }

    #[test]
    fn test_wrong_length_entry_is_a_miss() {
        let wide = HashedSmilesFingerprinter::new(64, 2).unwrap();
        let mut cache = InMemoryEncodingCache::new();
        cache.update(&["CCO".to_string()], &wide, Encoding::Dense).unwrap();

        let narrow = Arc::new(Mislabeled(HashedSmilesFingerprinter::new(32, 2).unwrap()));
        let fp = CachingFingerprinter::new(narrow, Box::new(cache));

        let single = fp.frozen().encode("CCO", Encoding::Dense).unwrap();
        assert_eq!(single.dimension(), 32);
        let batch = fp.encode_batch(&["CCO".to_string()], Encoding::Dense);
        assert_eq!(batch[0].as_ref().unwrap().dimension(), 32);

        // The miss replaced the stale entry.
        let stored = fp.cache().read().get_one("CCO", "smiles-hash-d64-r2", Encoding::Dense).unwrap();
        assert_eq!(stored.dimension(), 32);
    }

    #[test]
    fn test_warm_ignores_missing_tables() {
        let fp = create_test_fingerprinter();
        fp.warm().unwrap();
        assert_eq!(fp.cache().read().len(), 0);
    }
}
