//! Error types for fingerprinting and encoding-cache operations.

use thiserror::Error;

use crate::types::Encoding;

/// Encoding-specific errors.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The fingerprinter could not encode a structure string.
    ///
    /// Recoverable per item: batch callers record the item as a miss and move on.
    #[error("Unencodable structure '{smiles}': {reason}")]
    UnencodableStructure { smiles: String, reason: String },

    /// No persisted cache exists for the requested (fingerprint type, encoding) pair.
    #[error("Encoding cache not initialized for fingerprint type '{fingerprint_type}' and encoding '{encoding}'")]
    CacheNotInitialized {
        fingerprint_type: String,
        encoding: Encoding,
    },

    /// Structure absent from an initialized cache table.
    #[error("Cache miss for structure '{smiles}'")]
    CacheMiss { smiles: String },

    /// Cache file corrupt, unreadable or inconsistent.
    #[error("Cache error: {message}")]
    CacheError { message: String },

    /// bincode (de)serialization failed.
    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    /// Input validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EncodingError {
    /// Create an UnencodableStructure error.
    pub fn unencodable(smiles: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnencodableStructure {
            smiles: smiles.into(),
            reason: reason.into(),
        }
    }

    /// Create a CacheNotInitialized error.
    pub fn not_initialized(fingerprint_type: impl Into<String>, encoding: Encoding) -> Self {
        Self::CacheNotInitialized {
            fingerprint_type: fingerprint_type.into(),
            encoding,
        }
    }

    /// Create a CacheError.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::CacheError {
            message: message.into(),
        }
    }

    /// True for errors that only concern a single structure.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::UnencodableStructure { .. } | Self::CacheMiss { .. }
        )
    }
}

/// Result type for encoding operations.
pub type EncodingResult<T> = Result<T, EncodingError>;
