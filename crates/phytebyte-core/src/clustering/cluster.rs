//! Cluster of structurally related positive compounds.

use phytebyte_encoding::{EncodedCompound, Encoding, Fingerprinter};
use serde::{Deserialize, Serialize};

use super::error::{ClusterError, ClusterResult};
use crate::error::PipelineResult;
use crate::types::BioactiveCompound;

/// Non-empty group of positives produced by one clustering pass.
///
/// The cluster's position in the clusterer output is its identity for
/// pairing with negative samples; `id` records that position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    id: usize,
    members: Vec<BioactiveCompound>,
}

impl Cluster {
    /// # Errors
    /// `EmptyCluster` if `members` is empty.
    pub fn new(id: usize, members: Vec<BioactiveCompound>) -> ClusterResult<Self> {
        if members.is_empty() {
            return Err(ClusterError::EmptyCluster { id });
        }
        Ok(Self { id, members })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn members(&self) -> &[BioactiveCompound] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member structure strings, in member order.
    pub fn structures(&self) -> Vec<String> {
        self.members.iter().map(|m| m.smiles.clone()).collect()
    }

    /// Members encoded under `encoding`, computed on demand.
    ///
    /// # Errors
    /// The first encoding failure. Clustering already fingerprinted every
    /// member, so this only fails if the fingerprinter changed.
    pub fn encoded(
        &self,
        fingerprinter: &dyn Fingerprinter,
        encoding: Encoding,
    ) -> PipelineResult<Vec<EncodedCompound>> {
        let batch = fingerprinter.encode_batch(&self.structures(), encoding);
        batch
            .into_iter()
            .map(|r| r.map_err(Into::into))
            .collect()
    }
}
