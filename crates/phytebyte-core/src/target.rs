//! Query for fetching positives from a bioactivity source.

use serde::{Deserialize, Serialize};

use crate::types::{BioactiveCompound, CompoundBioactivity};

/// Accepted assay standards. An activity qualifies when its type, relation and
/// units are all accepted and its value is strictly below `max_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioactivityStandardFilter {
    pub types: Vec<String>,
    pub relations: Vec<String>,
    pub units: Vec<String>,
    pub max_value: f64,
}

impl Default for BioactivityStandardFilter {
    /// Sub-micromolar potency measurements.
    fn default() -> Self {
        Self {
            types: ["IC50", "EC50", "Ki", "Kd", "AC50", "Potency"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            relations: ["=", "<", "<="].iter().map(|s| s.to_string()).collect(),
            units: vec!["nM".to_string()],
            max_value: 1000.0,
        }
    }
}

impl BioactivityStandardFilter {
    pub fn accepts(&self, activity: &CompoundBioactivity) -> bool {
        self.types.iter().any(|t| t == &activity.activity_type)
            && self.relations.iter().any(|r| r == &activity.relation)
            && self.units.iter().any(|u| u == &activity.units)
            && activity.value < self.max_value
    }
}

/// What to fetch: gene targets, optional compound names and the activity filter.
///
/// Empty `gene_targets` or `compound_names` means no restriction on that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetInput {
    #[serde(default)]
    pub gene_targets: Vec<String>,
    #[serde(default)]
    pub compound_names: Vec<String>,
    #[serde(default)]
    pub filter: BioactivityStandardFilter,
}

impl TargetInput {
    pub fn for_genes<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gene_targets: genes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Apply the query to one record, keeping only qualifying activities.
    ///
    /// Returns `None` when the compound does not match or no activity qualifies.
    pub fn select(&self, compound: &BioactiveCompound) -> Option<BioactiveCompound> {
        if !self.gene_targets.is_empty()
            && !self.gene_targets.iter().any(|g| g == &compound.gene_target)
        {
            return None;
        }
        if !self.compound_names.is_empty()
            && !self.compound_names.iter().any(|n| n == &compound.name)
        {
            return None;
        }

        let bioactivities: Vec<CompoundBioactivity> = compound
            .bioactivities
            .iter()
            .filter(|a| self.filter.accepts(a))
            .cloned()
            .collect();
        if bioactivities.is_empty() {
            return None;
        }

        Some(BioactiveCompound {
            bioactivities,
            ..compound.clone()
        })
    }
}
