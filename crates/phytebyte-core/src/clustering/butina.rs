//! Taylor-Butina clustering.
//!
//! 1. Build each structure's neighbour list: every other structure with
//!    Tanimoto similarity >= threshold.
//! 2. Visit structures by neighbour count, descending; ties go to the earlier
//!    input position.
//! 3. An unassigned structure becomes a centre and claims its unassigned
//!    neighbours. Structures with no neighbours end up as singletons.

use std::sync::Arc;

use phytebyte_encoding::{tanimoto, Fingerprinter};
use tracing::debug;

use super::{validate_threshold, Cluster, Clusterer, PreparedInput};
use crate::error::PipelineResult;
use crate::sources::BioactiveCompoundIter;

pub struct ButinaClusterer {
    fingerprinter: Arc<dyn Fingerprinter>,
    threshold: f32,
}

impl ButinaClusterer {
    /// # Errors
    /// `ClusteringFailure` if `threshold` is outside (0, 1].
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>, threshold: f32) -> PipelineResult<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            fingerprinter,
            threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Clusterer for ButinaClusterer {
    fn find_clusters(&self, compounds: BioactiveCompoundIter<'_>) -> PipelineResult<Vec<Cluster>> {
        let prepared = PreparedInput::collect(compounds, self.fingerprinter.as_ref())?;
        let fps = &prepared.fingerprints;
        let n = fps.len();

        let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = tanimoto(&fps[i].vector, &fps[j].vector)?;
                if sim >= self.threshold {
                    neighbours[i].push(j);
                    neighbours[j].push(i);
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        // Stable sort keeps input order among equal counts.
        order.sort_by(|&a, &b| neighbours[b].len().cmp(&neighbours[a].len()));

        let mut assigned = vec![false; n];
        let mut assignments = Vec::new();
        for centre in order {
            if assigned[centre] {
                continue;
            }
            assigned[centre] = true;
            let mut members = vec![centre];
            for &j in &neighbours[centre] {
                if !assigned[j] {
                    assigned[j] = true;
                    members.push(j);
                }
            }
            debug!(
                "Butina centre {} claimed {} structures",
                fps[centre].smiles,
                members.len()
            );
            assignments.push(members);
        }

        prepared.into_clusters(assignments)
    }

    fn name(&self) -> &'static str {
        "butina"
    }
}
