//! Fingerprinter trait definition and strategy lookup.
//!
//! # Architecture
//!
//! ```text
//! Fingerprinter (trait)
//! ├── fingerprint_type() -> &str          // Cache-key component
//! ├── dimension() -> usize                // Output vector length
//! ├── encode(&str, Encoding) -> EncodedCompound
//! └── encode_batch(&[String], Encoding)   // One result per input, in order
//!
//! HashedSmilesFingerprinter               // Reference implementation
//! CachingFingerprinter                    // Wraps any fingerprinter with an EncodingCache
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EncodingError, EncodingResult};
use crate::hashed::HashedSmilesFingerprinter;
use crate::types::{EncodedCompound, Encoding};

/// Trait for fingerprint providers.
///
/// Implementations convert a structure string to a fixed-length vector. They
/// must be deterministic and must not mutate shared state from `encode`, so a
/// single instance can be shared read-only across scoring workers.
pub trait Fingerprinter: Send + Sync {
    /// Identifier of the fingerprint algorithm, part of every cache key.
    fn fingerprint_type(&self) -> &str;

    /// Length of every vector this fingerprinter produces.
    fn dimension(&self) -> usize;

    /// Encode one structure.
    ///
    /// # Errors
    /// `UnencodableStructure` if the structure string cannot be encoded.
    fn encode(&self, smiles: &str, encoding: Encoding) -> EncodingResult<EncodedCompound>;

    /// Encode many structures; one result per input, in input order.
    ///
    /// Default implementation calls `encode` for each structure.
    fn encode_batch(
        &self,
        smiles: &[String],
        encoding: Encoding,
    ) -> Vec<EncodingResult<EncodedCompound>> {
        smiles.iter().map(|s| self.encode(s, encoding)).collect()
    }
}

impl<F: Fingerprinter + ?Sized> Fingerprinter for Arc<F> {
    fn fingerprint_type(&self) -> &str {
        (**self).fingerprint_type()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn encode(&self, smiles: &str, encoding: Encoding) -> EncodingResult<EncodedCompound> {
        (**self).encode(smiles, encoding)
    }

    fn encode_batch(
        &self,
        smiles: &[String],
        encoding: Encoding,
    ) -> Vec<EncodingResult<EncodedCompound>> {
        (**self).encode_batch(smiles, encoding)
    }
}

/// Closed set of built-in fingerprinters, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintKind {
    /// Hashed SMILES token n-grams.
    #[default]
    SmilesHash,
}

impl FingerprintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintKind::SmilesHash => "smiles-hash",
        }
    }

    /// Construct the fingerprinter for this kind.
    ///
    /// # Errors
    /// `InvalidInput` if `dimension` is zero.
    pub fn create(&self, dimension: usize, radius: usize) -> EncodingResult<Arc<dyn Fingerprinter>> {
        match self {
            FingerprintKind::SmilesHash => Ok(Arc::new(HashedSmilesFingerprinter::new(
                dimension, radius,
            )?)),
        }
    }
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintKind {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smiles-hash" | "smiles_hash" => Ok(FingerprintKind::SmilesHash),
            other => Err(EncodingError::InvalidInput(format!(
                "unknown fingerprinter '{}'",
                other
            ))),
        }
    }
}
