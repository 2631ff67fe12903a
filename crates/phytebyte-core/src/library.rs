//! Candidate compound libraries: scoring candidates and the negative pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::jsonl::{read_all, JsonlRecords};
use crate::types::CandidateCompound;

/// Stream of candidate compounds.
pub type CandidateIter<'a> = Box<dyn Iterator<Item = PipelineResult<CandidateCompound>> + Send + 'a>;

/// Collection of structures that are not known to be active.
pub trait CompoundLibrary: Send + Sync {
    /// Every candidate, in library order.
    fn fetch_all(&self) -> PipelineResult<CandidateIter<'_>>;

    /// Distinct candidates whose structure is not in `excluded`, in an order
    /// fully determined by `seed`. Callers take as many as they need.
    fn fetch_random<'a>(
        &'a self,
        excluded: &HashSet<String>,
        seed: u64,
    ) -> PipelineResult<CandidateIter<'a>>;
}

/// Seeded shuffle of the eligible part of `candidates`.
///
/// The first occurrence of each structure wins.
fn shuffled_eligible(
    candidates: impl IntoIterator<Item = CandidateCompound>,
    excluded: &HashSet<String>,
    seed: u64,
) -> Vec<CandidateCompound> {
    let mut seen = HashSet::new();
    let mut pool: Vec<CandidateCompound> = candidates
        .into_iter()
        .filter(|c| !excluded.contains(&c.smiles) && seen.insert(c.smiles.clone()))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    pool.shuffle(&mut rng);
    debug!(
        "Random pool: {} eligible candidates ({} excluded structures, seed {})",
        pool.len(),
        excluded.len(),
        seed
    );
    pool
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCompoundLibrary {
    compounds: Vec<CandidateCompound>,
}

impl InMemoryCompoundLibrary {
    pub fn new(compounds: Vec<CandidateCompound>) -> Self {
        Self { compounds }
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }
}

impl CompoundLibrary for InMemoryCompoundLibrary {
    fn fetch_all(&self) -> PipelineResult<CandidateIter<'_>> {
        Ok(Box::new(self.compounds.iter().cloned().map(Ok)))
    }

    fn fetch_random<'a>(
        &'a self,
        excluded: &HashSet<String>,
        seed: u64,
    ) -> PipelineResult<CandidateIter<'a>> {
        let pool = shuffled_eligible(self.compounds.iter().cloned(), excluded, seed);
        Ok(Box::new(pool.into_iter().map(Ok)))
    }
}

/// Library backed by a JSON Lines file of `CandidateCompound` records.
///
/// `fetch_all` streams the file. Random draws share one parsed copy, read on
/// the first draw.
#[derive(Debug)]
pub struct JsonlCompoundLibrary {
    path: PathBuf,
    pool: OnceCell<Vec<CandidateCompound>>,
}

impl JsonlCompoundLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pool(&self) -> PipelineResult<&[CandidateCompound]> {
        let pool = self.pool.get_or_try_init(|| {
            let all: Vec<CandidateCompound> = read_all(&self.path)?;
            debug!("Indexed {} candidates from {}", all.len(), self.path.display());
            Ok::<_, PipelineError>(all)
        })?;
        Ok(pool)
    }
}

impl CompoundLibrary for JsonlCompoundLibrary {
    fn fetch_all(&self) -> PipelineResult<CandidateIter<'_>> {
        Ok(Box::new(JsonlRecords::<CandidateCompound>::open(&self.path)?))
    }

    fn fetch_random<'a>(
        &'a self,
        excluded: &HashSet<String>,
        seed: u64,
    ) -> PipelineResult<CandidateIter<'a>> {
        let pool = shuffled_eligible(self.pool()?.iter().cloned(), excluded, seed);
        Ok(Box::new(pool.into_iter().map(Ok)))
    }
}
