use std::sync::Arc;

use phytebyte_encoding::Fingerprinter;

use super::{Cluster, Clusterer, PreparedInput};
use crate::error::PipelineResult;
use crate::sources::BioactiveCompoundIter;

/// Puts every compound into one cluster.
pub struct SingleClusterer {
    fingerprinter: Arc<dyn Fingerprinter>,
}

impl SingleClusterer {
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        Self { fingerprinter }
    }
}

impl Clusterer for SingleClusterer {
    fn find_clusters(&self, compounds: BioactiveCompoundIter<'_>) -> PipelineResult<Vec<Cluster>> {
        let prepared = PreparedInput::collect(compounds, self.fingerprinter.as_ref())?;
        let all = (0..prepared.len()).collect();
        prepared.into_clusters(vec![all])
    }

    fn name(&self) -> &'static str {
        "single"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_test_fingerprinter, positives_iter};

    #[test]
    fn test_one_cluster_grouped_by_structure() {
        let clusterer = SingleClusterer::new(create_test_fingerprinter());
        let clusters = clusterer
            .find_clusters(positives_iter(&[(3, "CCO"), (1, "c1ccccc1"), (2, "CCO")]))
            .unwrap();

        assert_eq!(clusters.len(), 1);
        let uids: Vec<u64> = clusters[0].members().iter().map(|m| m.uid).collect();
        assert_eq!(uids, vec![3, 2, 1]);
    }
}
