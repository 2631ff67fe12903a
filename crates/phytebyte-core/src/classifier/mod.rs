//! Binary classifier contract and the bundled logistic-regression model.
//!
//! # Architecture
//!
//! ```text
//! BinaryClassifier (trait)
//! ├── expected_encoding() -> Encoding
//! ├── train(input, indices)
//! ├── can_evaluate(input) -> bool
//! ├── evaluate(input, threshold) -> F1
//! └── calc_score(encoded) -> probability of activity
//! ```

mod input;
mod logistic;

pub use input::BinaryClassifierInput;
pub use logistic::LogisticRegressionClassifier;

use std::fmt;
use std::str::FromStr;

use phytebyte_encoding::{EncodedCompound, Encoding};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Rows of each class a hold-out split needs: one to train on, one to test.
pub const MIN_ROWS_PER_CLASS: usize = 2;

/// Model that scores compounds for activity against one target.
pub trait BinaryClassifier: Send + Sync {
    /// Encoding the model's inputs must use.
    fn expected_encoding(&self) -> Encoding;

    /// Fit on the selected rows of `input`, replacing any previous fit.
    ///
    /// # Errors
    /// `Classifier` if the rows cannot be fitted (empty selection, one class
    /// only, wrong encoding).
    fn train(&mut self, input: &BinaryClassifierInput, indices: &[usize]) -> PipelineResult<()>;

    /// Whether `input` has enough rows of each class for `evaluate`.
    fn can_evaluate(&self, input: &BinaryClassifierInput) -> bool {
        input.positives().len() >= MIN_ROWS_PER_CLASS
            && input.negatives().len() >= MIN_ROWS_PER_CLASS
    }

    /// Hold-out evaluation; returns F1 of predictions at `threshold`.
    fn evaluate(&mut self, input: &BinaryClassifierInput, threshold: f32) -> PipelineResult<f32>;

    /// Probability that `encoded` is active.
    ///
    /// # Errors
    /// `Classifier` if the model is untrained or the vector does not fit it.
    fn calc_score(&self, encoded: &EncodedCompound) -> PipelineResult<f32>;

    fn is_trained(&self) -> bool;
}

/// F1 of `predicted` against `actual`. Zero when there are no true positives.
pub fn f1_score(predicted: &[bool], actual: &[bool]) -> f32 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&p, &a) in predicted.iter().zip(actual) {
        match (p, a) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    if tp == 0 {
        return 0.0;
    }
    2.0 * tp as f32 / (2 * tp + fp + fn_) as f32
}

/// Hyperparameters for the bundled classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    /// Seed for evaluation splits.
    pub seed: u64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-4,
            seed: 7,
        }
    }
}

/// Closed set of classifier families, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    #[default]
    LogisticRegression,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "logistic-regression",
        }
    }

    pub fn create(&self, params: &ClassifierParams) -> Box<dyn BinaryClassifier> {
        match self {
            ClassifierKind::LogisticRegression => {
                Box::new(LogisticRegressionClassifier::new(params.clone()))
            }
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logistic-regression" | "logistic_regression" | "logreg" => {
                Ok(ClassifierKind::LogisticRegression)
            }
            other => Err(PipelineError::invalid_parameter(format!(
                "unknown classifier '{}'",
                other
            ))),
        }
    }
}
