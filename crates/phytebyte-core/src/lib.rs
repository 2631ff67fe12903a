//! PhyteByte Core Library
//!
//! Assembles per-cluster classifier datasets from bioactivity records and
//! scores unlabeled compound libraries against trained models.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`BioactiveCompound`, `CandidateCompound`, `TargetInput`)
//! - Data access traits (`BioactivitySource`, `CompoundLibrary`) with in-memory and JSONL backends
//! - Clustering strategies (`Clusterer`, `ClusteringStrategy`)
//! - Negative sampling (`NegativeSampler`, `NegativeSample`)
//! - Dataset assembly (`ModelInputLoader`)
//! - Classifiers and the parallel scoring pipeline
//! - Error types and configuration structures
//!
//! # Example
//!
//! ```
//! use phytebyte_core::clustering::ClusteringStrategy;
//!
//! let strategy: ClusteringStrategy = "taylor-butina".parse().unwrap();
//! assert_eq!(strategy, ClusteringStrategy::Butina);
//! ```

pub mod assembler;
pub mod classifier;
pub mod clustering;
pub mod config;
pub mod error;
pub mod jsonl;
pub mod library;
pub mod phytebyte;
pub mod sampling;
pub mod scoring;
pub mod sources;
pub mod target;
pub mod types;

#[cfg(test)]
mod test_fixtures;

// Re-exports for convenience
pub use assembler::ModelInputLoader;
pub use classifier::{BinaryClassifier, BinaryClassifierInput, ClassifierKind, ClassifierParams};
pub use clustering::{Cluster, Clusterer, ClusteringStrategy};
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use library::{CompoundLibrary, InMemoryCompoundLibrary, JsonlCompoundLibrary};
pub use phytebyte::{ClusterEvaluation, PhyteByte};
pub use sampling::{NegativeSample, NegativeSampler, SamplingStrategy};
pub use scoring::{sort_predictions, Prediction, ScoringContext, ScoringOptions, ScoringPipeline};
pub use sources::{BioactivitySource, InMemoryBioactivitySource, JsonlBioactivitySource};
pub use target::{BioactivityStandardFilter, TargetInput};
pub use types::{BioactiveCompound, CandidateCompound, CompoundBioactivity};
