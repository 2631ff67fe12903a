//! Clustering engine: partitions positives into disjoint clusters.
//!
//! # Architecture
//!
//! ```text
//! Clusterer (trait)
//! └── find_clusters(iter) -> Vec<Cluster>   // deterministic, disjoint, exhaustive
//!
//! SingleClusterer   // everything in one cluster
//! ButinaClusterer   // Taylor-Butina sphere exclusion on Tanimoto similarity
//! LeaderClusterer   // single-pass leader assignment
//! ```
//!
//! Every strategy fingerprints every compound before deciding anything, so an
//! unencodable structure fails the whole pass. Compounds repeating an earlier
//! structure string follow that earlier compound into its cluster.

mod butina;
mod cluster;
mod error;
mod leader;
mod single;

pub use butina::ButinaClusterer;
pub use cluster::Cluster;
pub use error::{ClusterError, ClusterResult};
pub use leader::LeaderClusterer;
pub use single::SingleClusterer;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use phytebyte_encoding::{EncodedCompound, Encoding, Fingerprinter};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::sources::BioactiveCompoundIter;
use crate::types::BioactiveCompound;

/// Encoding used for similarity during clustering.
pub const CLUSTERING_ENCODING: Encoding = Encoding::BitArray;

/// Default Tanimoto similarity threshold.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.35;

/// Partitions a sequence of positives into clusters.
pub trait Clusterer: Send + Sync {
    /// Consume `compounds` and return the clusters, ordered by creation.
    ///
    /// # Errors
    /// - `ClusteringFailure` on empty input or an unencodable structure
    /// - Any error yielded by the compound stream
    fn find_clusters(&self, compounds: BioactiveCompoundIter<'_>) -> PipelineResult<Vec<Cluster>>;

    /// Strategy name, for logs.
    fn name(&self) -> &'static str;
}

/// Distinct structures of the input with their fingerprints.
///
/// `groups[i]` holds every compound sharing structure `i`, in input order;
/// `fingerprints[i]` is that structure's encoding.
#[derive(Debug)]
pub(crate) struct PreparedInput {
    pub groups: Vec<Vec<BioactiveCompound>>,
    pub fingerprints: Vec<EncodedCompound>,
}

impl PreparedInput {
    /// Drain the stream, merge repeated structures and fingerprint each one.
    pub fn collect(
        compounds: BioactiveCompoundIter<'_>,
        fingerprinter: &dyn Fingerprinter,
    ) -> PipelineResult<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<BioactiveCompound>> = Vec::new();
        let mut fingerprints = Vec::new();

        for compound in compounds {
            let compound = compound?;
            if let Some(&i) = index.get(&compound.smiles) {
                groups[i].push(compound);
                continue;
            }

            let encoded = fingerprinter
                .encode(&compound.smiles, CLUSTERING_ENCODING)
                .map_err(|e| {
                    error!("Clustering aborted: compound {} is unencodable: {}", compound.uid, e);
                    ClusterError::Unfingerprintable {
                        uid: compound.uid,
                        smiles: compound.smiles.clone(),
                        reason: e.to_string(),
                    }
                })?;

            index.insert(compound.smiles.clone(), groups.len());
            groups.push(vec![compound]);
            fingerprints.push(encoded);
        }

        if groups.is_empty() {
            error!("Clustering aborted: no compounds");
            return Err(ClusterError::EmptyInput.into());
        }
        Ok(Self {
            groups,
            fingerprints,
        })
    }

    /// Turn assignments (lists of structure indices, one per cluster) into
    /// clusters. Members are grouped by structure: structures in order of
    /// first appearance, each followed by all of its repeats.
    pub fn into_clusters(self, assignments: Vec<Vec<usize>>) -> PipelineResult<Vec<Cluster>> {
        let mut groups: Vec<Option<Vec<BioactiveCompound>>> =
            self.groups.into_iter().map(Some).collect();

        let clusters = assignments
            .into_iter()
            .enumerate()
            .map(|(id, mut structure_ids)| {
                structure_ids.sort_unstable();
                let members = structure_ids
                    .into_iter()
                    .filter_map(|i| groups.get_mut(i).and_then(Option::take))
                    .flatten()
                    .collect();
                Cluster::new(id, members)
            })
            .collect::<ClusterResult<Vec<_>>>()?;

        let total: usize = clusters.iter().map(Cluster::len).sum();
        info!("Formed {} clusters from {} compounds", clusters.len(), total);
        Ok(clusters)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// Reject thresholds outside (0, 1].
pub(crate) fn validate_threshold(threshold: f32) -> ClusterResult<()> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ClusterError::invalid_parameter(format!(
            "similarity_threshold must be in (0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}

/// Closed set of clustering strategies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringStrategy {
    Single,
    #[default]
    Butina,
    Leader,
}

impl ClusteringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringStrategy::Single => "single",
            ClusteringStrategy::Butina => "butina",
            ClusteringStrategy::Leader => "leader",
        }
    }

    /// Build the clusterer for this strategy.
    ///
    /// # Errors
    /// `ClusteringFailure` if `threshold` is outside (0, 1] for a
    /// similarity-based strategy.
    pub fn create(
        &self,
        fingerprinter: Arc<dyn Fingerprinter>,
        threshold: f32,
    ) -> PipelineResult<Box<dyn Clusterer>> {
        Ok(match self {
            ClusteringStrategy::Single => Box::new(SingleClusterer::new(fingerprinter)),
            ClusteringStrategy::Butina => Box::new(ButinaClusterer::new(fingerprinter, threshold)?),
            ClusteringStrategy::Leader => Box::new(LeaderClusterer::new(fingerprinter, threshold)?),
        })
    }
}

impl fmt::Display for ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(ClusteringStrategy::Single),
            "butina" | "taylor-butina" => Ok(ClusteringStrategy::Butina),
            "leader" => Ok(ClusteringStrategy::Leader),
            other => Err(PipelineError::invalid_parameter(format!(
                "unknown clustering strategy '{}'",
                other
            ))),
        }
    }
}
