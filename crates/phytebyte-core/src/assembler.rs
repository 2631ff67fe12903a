//! Dataset assembler: positives → clusters → per-cluster negatives → inputs.
//!
//! # Pipeline
//!
//! ```text
//! BioactivitySource ──► Clusterer ──► clusters[i]
//!                                        │  n_i * factor
//!                                        ▼
//!                         NegativeSampler::sample(excluded_i) ──► samples[i]
//!                                        │
//!                 clusters.len() == samples.len() ? ──► BinaryClassifierInput[i]
//! ```
//!
//! Fail-fast: the first error at any stage aborts `load` and leaves the loader
//! without inputs.

use std::collections::HashSet;

use phytebyte_encoding::{EncodedCompound, Encoding, Fingerprinter};
use tracing::{debug, error, info};

use crate::classifier::BinaryClassifierInput;
use crate::clustering::{Cluster, Clusterer};
use crate::error::{PipelineError, PipelineResult};
use crate::sampling::NegativeSampler;
use crate::sources::BioactivitySource;
use crate::target::TargetInput;
use crate::types::BioactiveCompound;

/// Builds one classifier dataset per positive cluster.
pub struct ModelInputLoader<'a> {
    source: &'a dyn BioactivitySource,
    sampler: &'a mut dyn NegativeSampler,
    clusterer: &'a dyn Clusterer,
    target: &'a TargetInput,
    fingerprinter: &'a dyn Fingerprinter,
    encoding: Encoding,
    exclude_all_positives: bool,
    clusters: Vec<Cluster>,
    inputs: Vec<BinaryClassifierInput>,
}

impl<'a> ModelInputLoader<'a> {
    /// # Arguments
    ///
    /// * `fingerprinter` - Encodes the positives; negatives are encoded by the sampler
    /// * `encoding` - Encoding the downstream classifier expects
    pub fn new(
        source: &'a dyn BioactivitySource,
        sampler: &'a mut dyn NegativeSampler,
        clusterer: &'a dyn Clusterer,
        target: &'a TargetInput,
        fingerprinter: &'a dyn Fingerprinter,
        encoding: Encoding,
    ) -> Self {
        Self {
            source,
            sampler,
            clusterer,
            target,
            fingerprinter,
            encoding,
            exclude_all_positives: false,
            clusters: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Exclude every positive, not only the cluster's own, from each
    /// cluster's negatives.
    pub fn exclude_all_positives(mut self, enabled: bool) -> Self {
        self.exclude_all_positives = enabled;
        self
    }

    /// Run the pipeline and return one input per cluster, in cluster order.
    ///
    /// # Errors
    /// - `InvalidParameter` if `neg_sample_size_factor` is zero
    /// - `ClusteringFailure` from clustering
    /// - `InsufficientCandidates` if any cluster cannot get its negatives
    /// - `PairingMismatch` if clusters and samples do not line up
    pub fn load(&mut self, neg_sample_size_factor: usize) -> PipelineResult<&[BinaryClassifierInput]> {
        self.clusters.clear();
        self.inputs.clear();

        if neg_sample_size_factor == 0 {
            error!("Dataset assembly aborted: neg_sample_size_factor is 0");
            return Err(PipelineError::invalid_parameter(
                "neg_sample_size_factor must be at least 1",
            ));
        }

        info!(
            "Assembling datasets: clusterer={}, encoding={}, factor={}",
            self.clusterer.name(),
            self.encoding,
            neg_sample_size_factor
        );
        let compounds = self.source.fetch_bioactive_compounds(self.target)?;
        let clusters = self.clusterer.find_clusters(compounds)?;

        self.sampler.set_sample_encoding(self.encoding);
        let samples = self.sample_negatives(&clusters, neg_sample_size_factor)?;

        let inputs = assemble_inputs(&clusters, samples, self.fingerprinter, self.encoding)?;
        info!("Assembled {} classifier inputs", inputs.len());

        self.clusters = clusters;
        self.inputs = inputs;
        Ok(&self.inputs)
    }

    /// Draw and encode every cluster's negatives.
    ///
    /// Each sample is materialized as soon as it is drawn, so a cluster short
    /// of candidates fails the load before any input is assembled.
    fn sample_negatives(
        &self,
        clusters: &[Cluster],
        factor: usize,
    ) -> PipelineResult<Vec<Vec<EncodedCompound>>> {
        let all_positives: HashSet<String> = if self.exclude_all_positives {
            clusters.iter().flat_map(Cluster::structures).collect()
        } else {
            HashSet::new()
        };

        let sampler: &dyn NegativeSampler = &*self.sampler;
        clusters
            .iter()
            .map(|cluster| {
                let excluded: HashSet<String> = if self.exclude_all_positives {
                    all_positives.clone()
                } else {
                    cluster.structures().into_iter().collect()
                };
                let count = cluster.len() * factor;
                debug!(
                    "Cluster {}: {} positives, sampling {} negatives",
                    cluster.id(),
                    cluster.len(),
                    count
                );
                sampler.sample(&excluded, count)?.materialize().map_err(|e| {
                    error!("Negative sampling failed for cluster {}: {}", cluster.id(), e);
                    e
                })
            })
            .collect()
    }

    /// Inputs from the last successful `load`, in cluster order.
    pub fn model_inputs(&self) -> &[BinaryClassifierInput] {
        &self.inputs
    }

    /// Clusters from the last successful `load`.
    pub fn positive_clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Fetch the positives without clustering or sampling.
    pub fn load_positive_compounds(&self) -> PipelineResult<Vec<BioactiveCompound>> {
        self.source.fetch_bioactive_compounds(self.target)?.collect()
    }
}

/// Pair cluster `i` with `samples[i]` into classifier inputs.
///
/// # Errors
/// `PairingMismatch` if the two sequences differ in length, otherwise the
/// first encoding or validation failure.
pub fn assemble_inputs(
    clusters: &[Cluster],
    samples: Vec<Vec<EncodedCompound>>,
    fingerprinter: &dyn Fingerprinter,
    encoding: Encoding,
) -> PipelineResult<Vec<BinaryClassifierInput>> {
    if clusters.len() != samples.len() {
        error!(
            "Pairing mismatch: {} clusters, {} samples",
            clusters.len(),
            samples.len()
        );
        return Err(PipelineError::PairingMismatch {
            clusters: clusters.len(),
            samples: samples.len(),
        });
    }

    clusters
        .iter()
        .zip(samples)
        .map(|(cluster, negatives)| {
            let positives = cluster.encoded(fingerprinter, encoding)?;
            BinaryClassifierInput::new(encoding, positives, negatives)
        })
        .collect()
}
