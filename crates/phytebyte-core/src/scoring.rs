//! Parallel scoring of unlabeled candidates against a trained model.
//!
//! # Architecture
//!
//! ```text
//! candidates ──► stream::iter ──► permit ──► spawn_blocking(encode + calc_score) ──► timeout
//!                                   (`workers` permits per pipeline)
//!                                          │
//!                         buffered(workers): results in input order
//!                                          │
//!                         failed / timed-out items dropped ──► Prediction
//! ```
//!
//! Workers only read the shared [`ScoringContext`]. A timed-out item is dropped
//! from the output, but its blocking task runs to completion in the background
//! and keeps its permit until then, so at most `workers` items are ever scored
//! at once.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use phytebyte_encoding::{Encoding, Fingerprinter};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::classifier::BinaryClassifier;
use crate::error::{PipelineError, PipelineResult};
use crate::types::CandidateCompound;

/// Default per-item deadline.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker count matching the machine's available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Immutable bundle every worker scores with.
pub struct ScoringContext {
    fingerprinter: Arc<dyn Fingerprinter>,
    model: Arc<dyn BinaryClassifier>,
    encoding: Encoding,
}

impl ScoringContext {
    /// # Errors
    /// `Classifier` if `model` has not been trained.
    pub fn new(
        fingerprinter: Arc<dyn Fingerprinter>,
        model: Arc<dyn BinaryClassifier>,
    ) -> PipelineResult<Self> {
        if !model.is_trained() {
            return Err(PipelineError::classifier("cannot score with an untrained model"));
        }
        let encoding = model.expected_encoding();
        Ok(Self {
            fingerprinter,
            model,
            encoding,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Encode `smiles` and score it.
    pub fn score(&self, smiles: &str) -> PipelineResult<f32> {
        let encoded = self.fingerprinter.encode(smiles, self.encoding)?;
        self.model.calc_score(&encoded)
    }
}

/// Concurrency limits for a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringOptions {
    pub workers: usize,
    pub item_timeout: Duration,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }
}

/// Scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub compound: CandidateCompound,
    pub score: f32,
}

pub struct ScoringPipeline {
    context: Arc<ScoringContext>,
    options: ScoringOptions,
    permits: Arc<Semaphore>,
}

impl ScoringPipeline {
    /// # Errors
    /// `InvalidParameter` for zero workers or a zero timeout.
    pub fn new(context: ScoringContext, options: ScoringOptions) -> PipelineResult<Self> {
        if options.workers == 0 {
            return Err(PipelineError::invalid_parameter("scoring workers must be > 0"));
        }
        if options.item_timeout.is_zero() {
            return Err(PipelineError::invalid_parameter("scoring item timeout must be > 0"));
        }
        Ok(Self {
            context: Arc::new(context),
            options,
            permits: Arc::new(Semaphore::new(options.workers)),
        })
    }

    pub fn options(&self) -> ScoringOptions {
        self.options
    }

    /// Score `candidates`, yielding predictions in input order.
    ///
    /// Candidates that fail to encode, fail to score, panic or exceed the
    /// per-item deadline are left out. Must be polled inside a tokio runtime.
    pub fn predict<I>(&self, candidates: I) -> impl Stream<Item = Prediction> + Send
    where
        I: IntoIterator<Item = CandidateCompound>,
        I::IntoIter: Send,
    {
        let context = Arc::clone(&self.context);
        let permits = Arc::clone(&self.permits);
        let deadline = self.options.item_timeout;

        stream::iter(candidates)
            .map(move |compound| {
                let context = Arc::clone(&context);
                let permits = Arc::clone(&permits);
                async move {
                    let score = score_one(context, permits, compound.smiles.clone(), deadline).await;
                    (compound, score)
                }
            })
            .buffered(self.options.workers)
            .filter_map(|(compound, score)| async move {
                score.map(|score| Prediction { compound, score })
            })
    }

    /// Collect every prediction, in input order.
    pub async fn predict_all<I>(&self, candidates: I) -> Vec<Prediction>
    where
        I: IntoIterator<Item = CandidateCompound>,
        I::IntoIter: Send,
    {
        self.predict(candidates).collect().await
    }
}

/// The deadline starts once a permit is held; waiting for one is not scoring time.
async fn score_one(
    context: Arc<ScoringContext>,
    permits: Arc<Semaphore>,
    smiles: String,
    deadline: Duration,
) -> Option<f32> {
    let permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            warn!("Scoring pool closed before '{}': {}", smiles, e);
            return None;
        }
    };
    let task_smiles = smiles.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        context.score(&task_smiles)
    });

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(Ok(score))) => Some(score),
        Ok(Ok(Err(e))) => {
            debug!("Dropping '{}' from predictions: {}", smiles, e);
            None
        }
        Ok(Err(join_error)) => {
            warn!("Scoring task for '{}' failed: {}", smiles, join_error);
            None
        }
        Err(_) => {
            warn!("Scoring '{}' exceeded {:?}", smiles, deadline);
            None
        }
    }
}

/// Predictions sorted by descending score. Ties keep their input order.
pub fn sort_predictions(mut predictions: Vec<Prediction>) -> Vec<Prediction> {
    predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BinaryClassifierInput;
    use crate::test_fixtures::create_test_fingerprinter;
    use phytebyte_encoding::EncodedCompound;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores by vector mass; sleeps or panics on marker structures.
    struct MarkerModel;

    impl BinaryClassifier for MarkerModel {
        fn expected_encoding(&self) -> Encoding {
            Encoding::BitArray
        }

        fn train(&mut self, _: &BinaryClassifierInput, _: &[usize]) -> PipelineResult<()> {
            Ok(())
        }

        fn evaluate(&mut self, _: &BinaryClassifierInput, _: f32) -> PipelineResult<f32> {
            Ok(1.0)
        }

        fn calc_score(&self, encoded: &EncodedCompound) -> PipelineResult<f32> {
            match encoded.smiles.as_str() {
                "CCCCCCCCCCCCCCCC" => std::thread::sleep(Duration::from_millis(300)),
                "CCCCCCCCCCCCCCCCN" => panic!("marker structure"),
                _ => {}
            }
            Ok(encoded.vector.iter().sum::<f32>() / encoded.dimension() as f32)
        }

        fn is_trained(&self) -> bool {
            true
        }
    }

    fn create_test_pipeline(workers: usize, timeout_ms: u64) -> ScoringPipeline {
        let context = ScoringContext::new(create_test_fingerprinter(), Arc::new(MarkerModel)).unwrap();
        ScoringPipeline::new(
            context,
            ScoringOptions {
                workers,
                item_timeout: Duration::from_millis(timeout_ms),
            },
        )
        .unwrap()
    }

    fn candidates(smiles: &[&str]) -> Vec<CandidateCompound> {
        smiles
            .iter()
            .enumerate()
            .map(|(i, s)| CandidateCompound::new(format!("fd{}", i), "", *s))
            .collect()
    }

    #[tokio::test]
    async fn test_unencodable_items_dropped_order_kept() {
        let pipeline = create_test_pipeline(4, 5_000);
        let input = candidates(&["CCO", "C1CC", "c1ccccc1", "C(C", "CCN", "CCCl"]);

        let predictions = pipeline.predict_all(input).await;
        let uids: Vec<&str> = predictions.iter().map(|p| p.compound.uid.as_str()).collect();
        println!("AFTER: {:?}", uids);
        assert_eq!(uids, vec!["fd0", "fd2", "fd4", "fd5"]);
    }

    #[tokio::test]
    async fn test_timeout_and_panic_yield_nothing() {
        let pipeline = create_test_pipeline(2, 100);
        let input = candidates(&["CCO", "CCCCCCCCCCCCCCCC", "CCCCCCCCCCCCCCCCN", "CCN"]);

        let predictions = pipeline.predict_all(input).await;
        let uids: Vec<&str> = predictions.iter().map(|p| p.compound.uid.as_str()).collect();
        assert_eq!(uids, vec!["fd0", "fd3"]);
    }

    /// Sleeps on every structure and records the peak number of overlapping calls.
    #[derive(Default)]
    struct SlowModel {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl BinaryClassifier for SlowModel {
        fn expected_encoding(&self) -> Encoding {
            Encoding::Dense
        }

        fn train(&mut self, _: &BinaryClassifierInput, _: &[usize]) -> PipelineResult<()> {
            Ok(())
        }

        fn evaluate(&mut self, _: &BinaryClassifierInput, _: f32) -> PipelineResult<f32> {
            Ok(1.0)
        }

        fn calc_score(&self, _: &EncodedCompound) -> PipelineResult<f32> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(150));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(0.5)
        }

        fn is_trained(&self) -> bool {
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_items_keep_pool_bounded() {
        let model = Arc::new(SlowModel::default());
        let context = ScoringContext::new(create_test_fingerprinter(), model.clone()).unwrap();
        let pipeline = ScoringPipeline::new(
            context,
            ScoringOptions {
                workers: 2,
                item_timeout: Duration::from_millis(20),
            },
        )
        .unwrap();
        let smiles: Vec<String> = (1..=10).map(|n| "C".repeat(n)).collect();
        let input = candidates(&smiles.iter().map(String::as_str).collect::<Vec<_>>());

        let predictions = pipeline.predict_all(input).await;
        // Let the last detached tasks finish before reading the peak.
        tokio::time::sleep(Duration::from_millis(400)).await;

        let peak = model.peak.load(Ordering::SeqCst);
        println!("AFTER: {} predictions, peak concurrent scoring = {}", predictions.len(), peak);
        assert!(predictions.is_empty());
        assert!(peak >= 1);
        assert!(peak <= 2, "peak {} exceeds 2 workers", peak);
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_results() {
        let input = candidates(&["CCO", "CCN", "c1ccccc1O", "OS(=O)(=O)O", "CC(=O)O"]);
        let serial = create_test_pipeline(1, 5_000).predict_all(input.clone()).await;
        let parallel = create_test_pipeline(8, 5_000).predict_all(input).await;
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_sort_predictions_descending_and_stable() {
        let p = |uid: &str, score: f32| Prediction {
            compound: CandidateCompound::new(uid, "", "C"),
            score,
        };
        let sorted = sort_predictions(vec![p("a", 0.2), p("b", 0.9), p("c", 0.2), p("d", 0.5)]);
        let uids: Vec<&str> = sorted.iter().map(|p| p.compound.uid.as_str()).collect();
        assert_eq!(uids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let context = || ScoringContext::new(create_test_fingerprinter(), Arc::new(MarkerModel)).unwrap();
        let zero_workers = ScoringOptions {
            workers: 0,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        };
        assert!(ScoringPipeline::new(context(), zero_workers).is_err());
        let zero_timeout = ScoringOptions {
            workers: 1,
            item_timeout: Duration::ZERO,
        };
        assert!(ScoringPipeline::new(context(), zero_timeout).is_err());
    }

    #[test]
    fn test_untrained_model_rejected() {
        let model = crate::classifier::LogisticRegressionClassifier::default();
        assert!(ScoringContext::new(create_test_fingerprinter(), Arc::new(model)).is_err());
    }
}
