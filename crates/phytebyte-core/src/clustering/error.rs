//! Error types for clustering operations.

use thiserror::Error;

use crate::error::PipelineError;

/// Errors that can occur while partitioning positives into clusters.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Nothing to cluster.
    #[error("No compounds to cluster")]
    EmptyInput,

    /// A compound's structure could not be fingerprinted.
    #[error("Cannot fingerprint compound {uid} ('{smiles}'): {reason}")]
    Unfingerprintable {
        uid: u64,
        smiles: String,
        reason: String,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what's wrong with the parameter
        message: String,
    },

    /// A cluster was built without members.
    #[error("Cluster {id} has no members")]
    EmptyCluster { id: usize },
}

impl ClusterError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }
}

impl From<ClusterError> for PipelineError {
    fn from(err: ClusterError) -> Self {
        PipelineError::ClusteringFailure(err.to_string())
    }
}

/// Result type alias for clustering operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
