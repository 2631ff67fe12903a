//! Hashed SMILES fingerprinter.

use xxhash_rust::xxh64::xxh64;

use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::smiles::{tokenize, Token};
use crate::types::{EncodedCompound, Encoding};

/// Default fingerprint length.
pub const DEFAULT_DIMENSION: usize = 1024;

/// Default neighbourhood radius; n-grams of up to `radius + 1` tokens are hashed.
pub const DEFAULT_RADIUS: usize = 2;

/// Fingerprinter that hashes SMILES token n-grams into a fixed-length vector.
///
/// Same structure string always produces the same vector, so it is usable both
/// as a cache key source and for reproducible tests. The fingerprint type
/// carries both parameters (`smiles-hash-d1024-r2`): fingerprinters that
/// encode differently never share a cache table.
#[derive(Debug, Clone)]
pub struct HashedSmilesFingerprinter {
    dimension: usize,
    radius: usize,
    type_id: String,
}

impl HashedSmilesFingerprinter {
    /// Create a fingerprinter with the given output length and radius.
    ///
    /// # Errors
    /// `InvalidInput` if `dimension` is zero.
    pub fn new(dimension: usize, radius: usize) -> EncodingResult<Self> {
        if dimension == 0 {
            return Err(EncodingError::InvalidInput(
                "fingerprint dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            radius,
            type_id: type_id(dimension, radius),
        })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Feature counts, before the encoding scheme is applied.
    fn feature_counts(&self, tokens: &[Token]) -> Vec<f32> {
        let mut counts = vec![0.0f32; self.dimension];
        let labels: Vec<&str> = tokens.iter().map(Token::label).collect();

        for n in 1..=self.radius + 1 {
            for window in labels.windows(n) {
                // Only n-grams anchored on an atom carry structural meaning.
                if !is_atom_label(window[0]) {
                    continue;
                }
                let joined = window.join("\u{1f}");
                let hash = xxh64(joined.as_bytes(), n as u64);
                counts[(hash % self.dimension as u64) as usize] += 1.0;
            }
        }

        counts
    }
}

fn type_id(dimension: usize, radius: usize) -> String {
    format!("smiles-hash-d{}-r{}", dimension, radius)
}

fn is_atom_label(label: &str) -> bool {
    !matches!(
        label,
        "-" | "=" | "#" | "$" | ":" | "/" | "\\" | "(" | ")" | "R" | "."
    )
}

impl Default for HashedSmilesFingerprinter {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            radius: DEFAULT_RADIUS,
            type_id: type_id(DEFAULT_DIMENSION, DEFAULT_RADIUS),
        }
    }
}

impl Fingerprinter for HashedSmilesFingerprinter {
    fn fingerprint_type(&self) -> &str {
        &self.type_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, smiles: &str, encoding: Encoding) -> EncodingResult<EncodedCompound> {
        let tokens = tokenize(smiles)?;
        let mut vector = self.feature_counts(&tokens);

        match encoding {
            Encoding::Dense => {
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for v in &mut vector {
                        *v /= norm;
                    }
                }
            }
            Encoding::BitArray => {
                for v in &mut vector {
                    *v = if *v > 0.0 { 1.0 } else { 0.0 };
                }
            }
        }

        EncodedCompound::new(smiles, self.fingerprint_type(), encoding, vector)
    }
}
