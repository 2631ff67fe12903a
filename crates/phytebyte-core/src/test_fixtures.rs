//! Shared helpers for unit tests.

use std::sync::Arc;

use phytebyte_encoding::{Fingerprinter, HashedSmilesFingerprinter};

use crate::library::InMemoryCompoundLibrary;
use crate::sources::BioactiveCompoundIter;
use crate::types::{BioactiveCompound, CandidateCompound, CompoundBioactivity};

pub fn create_test_fingerprinter() -> Arc<dyn Fingerprinter> {
    Arc::new(HashedSmilesFingerprinter::new(1024, 2).expect("valid dimension"))
}

pub fn create_test_positive(uid: u64, smiles: &str) -> BioactiveCompound {
    BioactiveCompound {
        uid,
        pref_name: None,
        smiles: smiles.to_string(),
        gene_target: "PTGS2".to_string(),
        name: format!("positive-{}", uid),
        bioactivities: vec![CompoundBioactivity::new(25.0, "nM", "IC50", "test assay")],
    }
}

pub fn positives_iter(input: &[(u64, &str)]) -> BioactiveCompoundIter<'static> {
    let compounds: Vec<BioactiveCompound> = input
        .iter()
        .map(|&(uid, smiles)| create_test_positive(uid, smiles))
        .collect();
    Box::new(compounds.into_iter().map(Ok))
}

/// `size` distinct, encodable aliphatic structures.
pub fn create_test_library(size: usize) -> InMemoryCompoundLibrary {
    const TAILS: [&str; 4] = ["", "O", "N", "S"];
    InMemoryCompoundLibrary::new(
        (0..size)
            .map(|i| {
                CandidateCompound::new(
                    format!("lib{}", i),
                    "",
                    format!("{}{}", "C".repeat(i + 1), TAILS[i % TAILS.len()]),
                )
            })
            .collect(),
    )
}
