use std::sync::Arc;

use phytebyte_encoding::{tanimoto, Fingerprinter};

use super::{validate_threshold, Cluster, Clusterer, PreparedInput};
use crate::error::PipelineResult;
use crate::sources::BioactiveCompoundIter;

/// Single-pass leader clustering.
///
/// Each structure joins the first cluster whose leader is at least
/// `threshold` similar, otherwise it leads a new cluster.
pub struct LeaderClusterer {
    fingerprinter: Arc<dyn Fingerprinter>,
    threshold: f32,
}

impl LeaderClusterer {
    /// # Errors
    /// `ClusteringFailure` if `threshold` is outside (0, 1].
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>, threshold: f32) -> PipelineResult<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            fingerprinter,
            threshold,
        })
    }
}

impl Clusterer for LeaderClusterer {
    fn find_clusters(&self, compounds: BioactiveCompoundIter<'_>) -> PipelineResult<Vec<Cluster>> {
        let prepared = PreparedInput::collect(compounds, self.fingerprinter.as_ref())?;
        let fps = &prepared.fingerprints;

        let mut assignments: Vec<Vec<usize>> = Vec::new();
        'structures: for i in 0..fps.len() {
            for members in assignments.iter_mut() {
                let leader = members[0];
                if tanimoto(&fps[leader].vector, &fps[i].vector)? >= self.threshold {
                    members.push(i);
                    continue 'structures;
                }
            }
            assignments.push(vec![i]);
        }

        prepared.into_clusters(assignments)
    }

    fn name(&self) -> &'static str {
        "leader"
    }
}
