//! Error types for phytebyte-core.

use phytebyte_encoding::{Encoding, EncodingError};
use thiserror::Error;

/// Top-level error type for the dataset-assembly and scoring pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No persisted encodings exist for the requested pair.
    #[error("Encoding cache not initialized for '{fingerprint_type}' / '{encoding}'")]
    CacheNotInitialized {
        fingerprint_type: String,
        encoding: Encoding,
    },

    /// The candidate library ran dry before the requested negatives were produced.
    #[error("Insufficient candidates: requested {requested}, produced {produced}")]
    InsufficientCandidates { requested: usize, produced: usize },

    /// A structure string could not be fingerprinted.
    #[error("Unencodable structure '{smiles}': {reason}")]
    UnencodableStructure { smiles: String, reason: String },

    /// Clustering could not partition the input.
    #[error("Clustering failed: {0}")]
    ClusteringFailure(String),

    /// Cluster and negative-sample sequences have different lengths.
    #[error("Pairing mismatch: {clusters} clusters but {samples} negative samples")]
    PairingMismatch { clusters: usize, samples: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Bioactivity source or compound library failed.
    #[error("Source error: {0}")]
    Source(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other encoding-layer failure.
    #[error("Encoding error: {0}")]
    Encoding(EncodingError),
}

impl PipelineError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier(message.into())
    }

    /// True for failures scoped to a single compound.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::UnencodableStructure { .. })
            || matches!(self, Self::Encoding(e) if e.is_per_item())
    }
}

impl From<EncodingError> for PipelineError {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::CacheNotInitialized {
                fingerprint_type,
                encoding,
            } => Self::CacheNotInitialized {
                fingerprint_type,
                encoding,
            },
            EncodingError::UnencodableStructure { smiles, reason } => {
                Self::UnencodableStructure { smiles, reason }
            }
            other => Self::Encoding(other),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
