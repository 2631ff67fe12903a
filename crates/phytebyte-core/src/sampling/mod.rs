//! Negative sampling: encoded compounds absent from the known-positive set.
//!
//! # Architecture
//!
//! ```text
//! NegativeSampler (trait)
//! ├── set_sample_encoding(encoding)        // must come first
//! └── sample(excluded, count) -> NegativeSample
//!
//! NegativeSample: lazy Iterator<Item = PipelineResult<EncodedCompound>>
//!   yields exactly `count` compounds, or InsufficientCandidates
//! ```

mod random;
mod sample;

pub use random::RandomNegativeSampler;
pub use sample::NegativeSample;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use phytebyte_encoding::{Encoding, Fingerprinter};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::library::CompoundLibrary;

/// Produces negatives for one cluster at a time.
pub trait NegativeSampler: Send + Sync {
    /// Encoding every sampled compound is produced in.
    fn set_sample_encoding(&mut self, encoding: Encoding);

    fn sample_encoding(&self) -> Option<Encoding>;

    /// Lazily sample `count` encoded compounds whose structures are not in
    /// `excluded` and are pairwise distinct.
    ///
    /// # Errors
    /// `InvalidParameter` if no sample encoding was set. Running out of
    /// candidates is reported by the returned iterator.
    fn sample<'a>(
        &'a self,
        excluded: &HashSet<String>,
        count: usize,
    ) -> PipelineResult<NegativeSample<'a>>;
}

/// Closed set of sampling strategies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Seeded random draws from a compound library.
    #[default]
    Random,
}

impl SamplingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingStrategy::Random => "random",
        }
    }

    pub fn create(
        &self,
        library: Arc<dyn CompoundLibrary>,
        fingerprinter: Arc<dyn Fingerprinter>,
        seed: u64,
    ) -> Box<dyn NegativeSampler> {
        match self {
            SamplingStrategy::Random => {
                Box::new(RandomNegativeSampler::new(library, fingerprinter, seed))
            }
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(SamplingStrategy::Random),
            other => Err(PipelineError::invalid_parameter(format!(
                "unknown sampling strategy '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_lookup_by_name() {
        assert_eq!("random".parse::<SamplingStrategy>().unwrap(), SamplingStrategy::Random);
        assert_eq!(SamplingStrategy::Random.to_string(), "random");
        assert!("similarity".parse::<SamplingStrategy>().is_err());
    }
}
