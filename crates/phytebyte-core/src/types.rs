//! Compound records produced by bioactivity sources and compound libraries.

use serde::{Deserialize, Serialize};

/// One measured activity of a compound against its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundBioactivity {
    pub value: f64,
    pub units: String,
    /// Assay standard type, e.g. `IC50`.
    pub activity_type: String,
    #[serde(default)]
    pub description: String,
    /// Comparison recorded with the value (`=`, `<`, `<=`).
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "=".to_string()
}

impl CompoundBioactivity {
    pub fn new(
        value: f64,
        units: impl Into<String>,
        activity_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            value,
            units: units.into(),
            activity_type: activity_type.into(),
            description: description.into(),
            relation: default_relation(),
        }
    }
}

/// A compound with known activity against a gene target.
///
/// Produced only by a [`BioactivitySource`](crate::sources::BioactivitySource)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioactiveCompound {
    pub uid: u64,
    #[serde(default)]
    pub pref_name: Option<String>,
    /// Canonical structure string.
    pub smiles: String,
    pub gene_target: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bioactivities: Vec<CompoundBioactivity>,
}

impl BioactiveCompound {
    /// Preferred name when known, otherwise the record name.
    pub fn display_name(&self) -> &str {
        self.pref_name.as_deref().unwrap_or(&self.name)
    }
}

/// Unlabeled compound to be scored, e.g. a food constituent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateCompound {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    pub smiles: String,
}

impl CandidateCompound {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            smiles: smiles.into(),
        }
    }
}
