//! Encoding schemes and encoded compounds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EncodingError, EncodingResult};

/// Numeric representation format a classifier expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Real-valued vector, L2-normalized feature counts.
    Dense,
    /// 0/1 presence vector.
    BitArray,
}

impl Encoding {
    /// Stable lowercase name, also used in cache file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Dense => "dense",
            Encoding::BitArray => "bitarray",
        }
    }

    /// All supported encodings.
    pub fn all() -> [Encoding; 2] {
        [Encoding::Dense, Encoding::BitArray]
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" | "numpy" => Ok(Encoding::Dense),
            "bitarray" | "bit-array" | "bits" => Ok(Encoding::BitArray),
            other => Err(EncodingError::InvalidInput(format!(
                "unknown encoding '{}', expected 'dense' or 'bitarray'",
                other
            ))),
        }
    }
}

/// Fixed-length vector tagged with the scheme and fingerprint type that produced it.
///
/// Derived data. The cache key is `(smiles, fingerprint_type, encoding)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedCompound {
    /// Structure string the vector was computed from.
    pub smiles: String,
    /// Identifier of the fingerprinter, e.g. `smiles-hash`.
    pub fingerprint_type: String,
    pub encoding: Encoding,
    pub vector: Vec<f32>,
}

impl EncodedCompound {
    /// Create an encoded compound, rejecting empty vectors.
    pub fn new(
        smiles: impl Into<String>,
        fingerprint_type: impl Into<String>,
        encoding: Encoding,
        vector: Vec<f32>,
    ) -> EncodingResult<Self> {
        let smiles = smiles.into();
        if vector.is_empty() {
            return Err(EncodingError::InvalidInput(format!(
                "encoded vector for '{}' is empty",
                smiles
            )));
        }
        Ok(Self {
            smiles,
            fingerprint_type: fingerprint_type.into(),
            encoding,
            vector,
        })
    }

    /// Vector length.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    /// Continuous Tanimoto similarity; equals the Jaccard index for 0/1 vectors.
    ///
    /// # Errors
    /// `DimensionMismatch` if the vectors differ in length.
    pub fn tanimoto(&self, other: &EncodedCompound) -> EncodingResult<f32> {
        tanimoto(&self.vector, &other.vector)
    }
}

/// Continuous Tanimoto similarity of two equal-length vectors, in `0.0..=1.0`
/// for non-negative inputs. Two zero vectors are treated as identical.
pub fn tanimoto(a: &[f32], b: &[f32]) -> EncodingResult<f32> {
    if a.len() != b.len() {
        return Err(EncodingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a + norm_b - dot;
    if denom <= f32::EPSILON {
        return Ok(1.0);
    }
    Ok(dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_parse_and_display() {
        for encoding in Encoding::all() {
            let parsed: Encoding = encoding.as_str().parse().unwrap();
            assert_eq!(parsed, encoding);
        }
        assert_eq!("numpy".parse::<Encoding>().unwrap(), Encoding::Dense);
        assert_eq!(" Bit-Array ".parse::<Encoding>().unwrap(), Encoding::BitArray);
        assert!("sparse".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_empty_vector_rejected() {
        let result = EncodedCompound::new("CCO", "smiles-hash", Encoding::Dense, vec![]);
        assert!(matches!(result, Err(EncodingError::InvalidInput(_))));
    }

    #[test]
    fn test_tanimoto_bits_is_jaccard() {
        let a = [1.0, 1.0, 0.0, 1.0];
        let b = [1.0, 0.0, 0.0, 1.0];
        // |a & b| = 2, |a | b| = 3
        let sim = tanimoto(&a, &b).unwrap();
        assert!((sim - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_tanimoto_identity_and_disjoint() {
        let a = [0.2, 0.4, 0.0];
        let b = [0.0, 0.0, 0.7];
        assert!((tanimoto(&a, &a).unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(tanimoto(&a, &b).unwrap(), 0.0);
        assert_eq!(tanimoto(&[0.0; 3], &[0.0; 3]).unwrap(), 1.0);
    }

    #[test]
    fn test_tanimoto_dimension_mismatch() {
        let err = tanimoto(&[1.0, 0.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
