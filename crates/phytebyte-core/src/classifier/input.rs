//! Classifier-ready dataset for one cluster.

use phytebyte_encoding::{EncodedCompound, Encoding};

use crate::error::{PipelineError, PipelineResult};

/// Positives and negatives under one encoding.
///
/// Row `i < positives.len()` is positive `i`; the remaining rows are the
/// negatives in sample order. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryClassifierInput {
    encoding: Encoding,
    dimension: usize,
    positives: Vec<EncodedCompound>,
    negatives: Vec<EncodedCompound>,
}

impl BinaryClassifierInput {
    /// # Errors
    /// `InvalidParameter` if a vector is in another encoding or has another
    /// length than the first one, or if both sides are empty.
    pub fn new(
        encoding: Encoding,
        positives: Vec<EncodedCompound>,
        negatives: Vec<EncodedCompound>,
    ) -> PipelineResult<Self> {
        let dimension = positives
            .iter()
            .chain(&negatives)
            .next()
            .map(EncodedCompound::dimension)
            .ok_or_else(|| PipelineError::invalid_parameter("classifier input has no rows"))?;

        for row in positives.iter().chain(&negatives) {
            if row.encoding != encoding {
                return Err(PipelineError::invalid_parameter(format!(
                    "'{}' is encoded as {}, expected {}",
                    row.smiles, row.encoding, encoding
                )));
            }
            if row.dimension() != dimension {
                return Err(PipelineError::invalid_parameter(format!(
                    "'{}' has dimension {}, expected {}",
                    row.smiles,
                    row.dimension(),
                    dimension
                )));
            }
        }

        Ok(Self {
            encoding,
            dimension,
            positives,
            negatives,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn positives(&self) -> &[EncodedCompound] {
        &self.positives
    }

    pub fn negatives(&self) -> &[EncodedCompound] {
        &self.negatives
    }

    /// Total rows.
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every row index, for training on the whole dataset.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    /// Label of every row, positives first.
    pub fn labels(&self) -> Vec<bool> {
        let mut labels = vec![true; self.positives.len()];
        labels.resize(self.len(), false);
        labels
    }

    fn row(&self, i: usize) -> Option<(&EncodedCompound, bool)> {
        let p = self.positives.len();
        if i < p {
            Some((&self.positives[i], true))
        } else {
            self.negatives.get(i - p).map(|n| (n, false))
        }
    }

    /// Feature vectors and labels of the selected rows, in `indices` order.
    ///
    /// # Errors
    /// `InvalidParameter` for an index past the last row.
    pub fn index(&self, indices: &[usize]) -> PipelineResult<(Vec<&[f32]>, Vec<bool>)> {
        let mut features = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            let (row, label) = self.row(i).ok_or_else(|| {
                PipelineError::invalid_parameter(format!(
                    "row index {} out of range for {} rows",
                    i,
                    self.len()
                ))
            })?;
            features.push(row.as_slice());
            labels.push(label);
        }
        Ok((features, labels))
    }
}
