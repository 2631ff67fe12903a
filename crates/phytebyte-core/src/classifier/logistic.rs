//! Logistic regression trained by full-batch gradient descent.

use phytebyte_encoding::{EncodedCompound, Encoding};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::{f1_score, BinaryClassifier, BinaryClassifierInput, ClassifierParams, MIN_ROWS_PER_CLASS};
use crate::error::{PipelineError, PipelineResult};

/// Share of each class held out by `evaluate`.
const HOLDOUT_FRACTION: f32 = 0.25;

#[derive(Debug, Clone)]
struct Fit {
    weights: Vec<f32>,
    bias: f32,
}

#[derive(Debug, Clone)]
pub struct LogisticRegressionClassifier {
    params: ClassifierParams,
    fit: Option<Fit>,
}

#[inline]
fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegressionClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params, fit: None }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    fn predict(fit: &Fit, x: &[f32]) -> f32 {
        let z: f32 = fit.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + fit.bias;
        sigmoid(z)
    }

    /// Seeded stratified split of `input` into (train, test) row indices.
    fn holdout_split(&self, input: &BinaryClassifierInput) -> PipelineResult<(Vec<usize>, Vec<usize>)> {
        let p = input.positives().len();
        let n = input.negatives().len();
        if !self.can_evaluate(input) {
            return Err(PipelineError::classifier(format!(
                "evaluation needs at least {} positives and {} negatives, got {} and {}",
                MIN_ROWS_PER_CLASS, MIN_ROWS_PER_CLASS, p, n
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let mut train = Vec::new();
        let mut test = Vec::new();
        for mut class in [(0..p).collect::<Vec<_>>(), (p..p + n).collect()] {
            class.shuffle(&mut rng);
            let held = ((class.len() as f32 * HOLDOUT_FRACTION).round() as usize)
                .clamp(1, class.len() - 1);
            test.extend_from_slice(&class[..held]);
            train.extend_from_slice(&class[held..]);
        }
        Ok((train, test))
    }
}

impl Default for LogisticRegressionClassifier {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

impl BinaryClassifier for LogisticRegressionClassifier {
    fn expected_encoding(&self) -> Encoding {
        Encoding::Dense
    }

    fn train(&mut self, input: &BinaryClassifierInput, indices: &[usize]) -> PipelineResult<()> {
        if input.encoding() != self.expected_encoding() {
            return Err(PipelineError::classifier(format!(
                "logistic regression expects {} input, got {}",
                self.expected_encoding(),
                input.encoding()
            )));
        }
        let (x, y) = input.index(indices)?;
        if x.is_empty() {
            return Err(PipelineError::classifier("no rows selected for training"));
        }
        if y.iter().all(|&l| l) || y.iter().all(|&l| !l) {
            return Err(PipelineError::classifier("training rows contain a single class"));
        }

        let dim = input.dimension();
        let rows = x.len() as f32;
        let mut fit = Fit {
            weights: vec![0.0; dim],
            bias: 0.0,
        };

        for epoch in 0..self.params.epochs {
            let mut grad_w = vec![0.0f32; dim];
            let mut grad_b = 0.0f32;
            let mut loss = 0.0f32;

            for (row, &label) in x.iter().zip(&y) {
                let target = if label { 1.0 } else { 0.0 };
                let p = Self::predict(&fit, row);
                let err = p - target;
                for (g, v) in grad_w.iter_mut().zip(row.iter()) {
                    *g += err * v;
                }
                grad_b += err;
                loss -= target * p.max(1e-7).ln() + (1.0 - target) * (1.0 - p).max(1e-7).ln();
            }

            for (w, g) in fit.weights.iter_mut().zip(&grad_w) {
                *w -= self.params.learning_rate * (g / rows + self.params.l2 * *w);
            }
            fit.bias -= self.params.learning_rate * grad_b / rows;

            if epoch % 100 == 0 {
                debug!("epoch {}: mean log loss {:.4}", epoch, loss / rows);
            }
        }

        self.fit = Some(fit);
        Ok(())
    }

    fn evaluate(&mut self, input: &BinaryClassifierInput, threshold: f32) -> PipelineResult<f32> {
        let (train, test) = self.holdout_split(input)?;
        self.train(input, &train)?;

        let (x, actual) = input.index(&test)?;
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| PipelineError::classifier("model not trained"))?;
        let predicted: Vec<bool> = x.iter().map(|row| Self::predict(fit, row) >= threshold).collect();

        let f1 = f1_score(&predicted, &actual);
        info!(
            "Hold-out F1 {:.3} on {} rows ({} train)",
            f1,
            test.len(),
            train.len()
        );
        Ok(f1)
    }

    fn calc_score(&self, encoded: &EncodedCompound) -> PipelineResult<f32> {
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| PipelineError::classifier("model not trained"))?;
        if encoded.encoding != self.expected_encoding() {
            return Err(PipelineError::classifier(format!(
                "'{}' is encoded as {}, model expects {}",
                encoded.smiles,
                encoded.encoding,
                self.expected_encoding()
            )));
        }
        if encoded.dimension() != fit.weights.len() {
            return Err(PipelineError::classifier(format!(
                "'{}' has dimension {}, model expects {}",
                encoded.smiles,
                encoded.dimension(),
                fit.weights.len()
            )));
        }
        Ok(Self::predict(fit, encoded.as_slice()))
    }

    fn is_trained(&self) -> bool {
        self.fit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, v: Vec<f32>) -> EncodedCompound {
        EncodedCompound::new(name, "test", Encoding::Dense, v).unwrap()
    }

    /// Positives load on the first axis, negatives on the second.
    fn create_separable_input(p: usize, n: usize) -> BinaryClassifierInput {
        let positives = (0..p)
            .map(|i| row(&format!("p{}", i), vec![1.0, 0.1 * (i % 3) as f32]))
            .collect();
        let negatives = (0..n)
            .map(|i| row(&format!("n{}", i), vec![0.1 * (i % 3) as f32, 1.0]))
            .collect();
        BinaryClassifierInput::new(Encoding::Dense, positives, negatives).unwrap()
    }

    #[test]
    fn test_untrained_model_refuses_to_score() {
        let model = LogisticRegressionClassifier::default();
        assert!(model.calc_score(&row("x", vec![1.0, 0.0])).is_err());
    }

    #[test]
    fn test_learns_separable_data() {
        let input = create_separable_input(8, 24);
        let mut model = LogisticRegressionClassifier::default();
        model.train(&input, &input.all_indices()).unwrap();

        let active = model.calc_score(&row("a", vec![1.0, 0.0])).unwrap();
        let inactive = model.calc_score(&row("b", vec![0.0, 1.0])).unwrap();
        println!("AFTER training: active={:.3} inactive={:.3}", active, inactive);
        assert!(active > 0.5);
        assert!(inactive < 0.5);
    }

    #[test]
    fn test_evaluate_returns_perfect_f1_on_separable_data() {
        let input = create_separable_input(8, 24);
        let mut model = LogisticRegressionClassifier::default();
        let f1 = model.evaluate(&input, 0.5).unwrap();
        assert!((f1 - 1.0).abs() < 1e-6, "f1 = {}", f1);
    }

    #[test]
    fn test_evaluate_is_seed_deterministic() {
        let input = create_separable_input(6, 18);
        let mut a = LogisticRegressionClassifier::default();
        let mut b = LogisticRegressionClassifier::default();
        assert_eq!(a.evaluate(&input, 0.5).unwrap(), b.evaluate(&input, 0.5).unwrap());
    }

    #[test]
    fn test_rejects_bad_training_rows() {
        let input = create_separable_input(3, 3);
        let mut model = LogisticRegressionClassifier::default();
        assert!(model.train(&input, &[]).is_err());
        assert!(model.train(&input, &[0, 1, 2]).is_err());
        assert!(!model.can_evaluate(&create_separable_input(1, 3)));
        assert!(model.evaluate(&create_separable_input(1, 3), 0.5).is_err());
        assert!(model.can_evaluate(&create_separable_input(2, 2)));
    }

    #[test]
    fn test_wrong_dimension_or_encoding_rejected() {
        let input = create_separable_input(4, 4);
        let mut model = LogisticRegressionClassifier::default();
        model.train(&input, &input.all_indices()).unwrap();

        assert!(model.calc_score(&row("x", vec![1.0, 0.0, 0.0])).is_err());
        let bits = EncodedCompound::new("x", "test", Encoding::BitArray, vec![1.0, 0.0]).unwrap();
        assert!(model.calc_score(&bits).is_err());
    }
}
