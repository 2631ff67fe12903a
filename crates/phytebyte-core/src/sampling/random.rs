use std::collections::HashSet;
use std::sync::Arc;

use phytebyte_encoding::{Encoding, Fingerprinter};
use tracing::{debug, error};
use xxhash_rust::xxh64::xxh64;

use super::{NegativeSample, NegativeSampler};
use crate::error::{PipelineError, PipelineResult};
use crate::library::CompoundLibrary;

/// Samples negatives by seeded random draws from a compound library.
///
/// The draw order depends only on the configured seed and the exclusion set,
/// so the same cluster always receives the same negatives.
pub struct RandomNegativeSampler {
    library: Arc<dyn CompoundLibrary>,
    fingerprinter: Arc<dyn Fingerprinter>,
    seed: u64,
    encoding: Option<Encoding>,
}

impl RandomNegativeSampler {
    pub fn new(
        library: Arc<dyn CompoundLibrary>,
        fingerprinter: Arc<dyn Fingerprinter>,
        seed: u64,
    ) -> Self {
        Self {
            library,
            fingerprinter,
            seed,
            encoding: None,
        }
    }

    /// Seed for one exclusion set: xxh64 of the sorted structures, seeded with
    /// the configured seed.
    pub fn derive_seed(&self, excluded: &HashSet<String>) -> u64 {
        let mut sorted: Vec<&str> = excluded.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        xxh64(sorted.join("\n").as_bytes(), self.seed)
    }
}

impl NegativeSampler for RandomNegativeSampler {
    fn set_sample_encoding(&mut self, encoding: Encoding) {
        self.encoding = Some(encoding);
    }

    fn sample_encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    fn sample<'a>(
        &'a self,
        excluded: &HashSet<String>,
        count: usize,
    ) -> PipelineResult<NegativeSample<'a>> {
        let encoding = self.encoding.ok_or_else(|| {
            error!("Negative sampling requested before a sample encoding was set");
            PipelineError::invalid_parameter("sample encoding must be set before sampling")
        })?;

        let seed = self.derive_seed(excluded);
        debug!(
            "Sampling {} negatives ({} excluded, seed {:#x})",
            count,
            excluded.len(),
            seed
        );
        let candidates = self.library.fetch_random(excluded, seed)?;
        Ok(NegativeSample::new(
            candidates,
            self.fingerprinter.as_ref(),
            encoding,
            excluded.clone(),
            count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::InMemoryCompoundLibrary;
    use crate::test_fixtures::{create_test_fingerprinter, create_test_library};

    fn create_test_sampler(library_size: usize) -> RandomNegativeSampler {
        let library: Arc<dyn CompoundLibrary> = Arc::new(create_test_library(library_size));
        RandomNegativeSampler::new(library, create_test_fingerprinter(), 42)
    }

    fn smiles_of(sampler: &RandomNegativeSampler, excluded: &HashSet<String>, count: usize) -> Vec<String> {
        sampler
            .sample(excluded, count)
            .unwrap()
            .map(|r| r.unwrap().smiles)
            .collect()
    }

    #[test]
    fn test_sample_without_encoding_fails() {
        let sampler = create_test_sampler(10);
        let result = sampler.sample(&HashSet::new(), 3);
        assert!(matches!(result, Err(PipelineError::InvalidParameter(_))));
    }

    #[test]
    fn test_sample_is_reproducible_and_excludes() {
        let mut sampler = create_test_sampler(40);
        sampler.set_sample_encoding(Encoding::Dense);
        let excluded: HashSet<String> = smiles_of(&sampler, &HashSet::new(), 5).into_iter().collect();

        let a = smiles_of(&sampler, &excluded, 10);
        let b = smiles_of(&sampler, &excluded, 10);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.iter().all(|s| !excluded.contains(s)));
    }

    #[test]
    fn test_different_exclusions_draw_differently() {
        let sampler = create_test_sampler(0);
        let x: HashSet<String> = ["CCO".to_string()].into_iter().collect();
        let y: HashSet<String> = ["CCN".to_string()].into_iter().collect();
        assert_ne!(sampler.derive_seed(&x), sampler.derive_seed(&y));
        assert_eq!(sampler.derive_seed(&x), sampler.derive_seed(&x.clone()));
    }

    #[test]
    fn test_small_library_reports_insufficient() {
        let library: Arc<dyn CompoundLibrary> = Arc::new(InMemoryCompoundLibrary::new(vec![]));
        let mut sampler = RandomNegativeSampler::new(library, create_test_fingerprinter(), 1);
        sampler.set_sample_encoding(Encoding::BitArray);

        let err = sampler.sample(&HashSet::new(), 2).unwrap().materialize().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientCandidates { requested: 2, produced: 0 }
        ));
    }
}
