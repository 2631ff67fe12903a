//! Top-level orchestration: train, evaluate and predict for one target.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use phytebyte_encoding::{Encoding, Fingerprinter};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::assembler::ModelInputLoader;
use crate::classifier::{BinaryClassifier, BinaryClassifierInput};
use crate::clustering::{Cluster, Clusterer, ClusteringStrategy};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::library::CompoundLibrary;
use crate::sampling::{NegativeSampler, SamplingStrategy};
use crate::scoring::{sort_predictions, Prediction, ScoringContext, ScoringOptions, ScoringPipeline};
use crate::sources::BioactivitySource;
use crate::target::TargetInput;
use crate::types::BioactiveCompound;

/// Hold-out result for one positive cluster. `f1` is `None` when the
/// cluster was too small to split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterEvaluation {
    pub cluster_id: usize,
    pub positives: usize,
    pub negatives: usize,
    pub f1: Option<f32>,
}

/// Bioactivity model workflow for one [`TargetInput`].
///
/// Holds the collaborators the dataset assembler needs. Clusterer and
/// negative sampler must be set before any operation that assembles data.
pub struct PhyteByte {
    source: Arc<dyn BioactivitySource>,
    target: TargetInput,
    fingerprinter: Arc<dyn Fingerprinter>,
    scoring_fingerprinter: Arc<dyn Fingerprinter>,
    clusterer: Option<Box<dyn Clusterer>>,
    sampler: Option<Box<dyn NegativeSampler>>,
    exclude_all_positives: bool,
    scoring: ScoringOptions,
}

impl PhyteByte {
    pub fn new(
        source: Arc<dyn BioactivitySource>,
        target: TargetInput,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> Self {
        Self {
            source,
            target,
            scoring_fingerprinter: Arc::clone(&fingerprinter),
            fingerprinter,
            clusterer: None,
            sampler: None,
            exclude_all_positives: false,
            scoring: ScoringOptions::default(),
        }
    }

    /// Wire every collaborator from `config`.
    ///
    /// # Errors
    /// `ClusteringFailure` for an invalid similarity threshold.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn BioactivitySource>,
        negative_library: Arc<dyn CompoundLibrary>,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> PipelineResult<Self> {
        let mut phytebyte = Self::new(source, config.target.clone(), fingerprinter);
        phytebyte.set_positive_clusterer(
            config.clustering.strategy,
            config.clustering.similarity_threshold,
        )?;
        phytebyte.set_negative_sampler(
            config.sampling.strategy,
            negative_library,
            config.sampling.seed,
        );
        phytebyte.exclude_all_positives = config.sampling.exclude_all_positives;
        phytebyte.scoring = config.scoring.options();
        Ok(phytebyte)
    }

    pub fn set_positive_clusterer(
        &mut self,
        strategy: ClusteringStrategy,
        similarity_threshold: f32,
    ) -> PipelineResult<()> {
        self.clusterer = Some(strategy.create(Arc::clone(&self.fingerprinter), similarity_threshold)?);
        Ok(())
    }

    /// Use a clusterer built outside [`ClusteringStrategy`].
    pub fn set_clusterer(&mut self, clusterer: Box<dyn Clusterer>) {
        self.clusterer = Some(clusterer);
    }

    pub fn set_negative_sampler(
        &mut self,
        strategy: SamplingStrategy,
        library: Arc<dyn CompoundLibrary>,
        seed: u64,
    ) {
        self.sampler = Some(strategy.create(library, Arc::clone(&self.fingerprinter), seed));
    }

    pub fn set_exclude_all_positives(&mut self, enabled: bool) {
        self.exclude_all_positives = enabled;
    }

    pub fn set_scoring_options(&mut self, options: ScoringOptions) {
        self.scoring = options;
    }

    /// Fingerprinter used by scoring workers, e.g. a frozen caching view.
    pub fn set_scoring_fingerprinter(&mut self, fingerprinter: Arc<dyn Fingerprinter>) {
        self.scoring_fingerprinter = fingerprinter;
    }

    pub fn target(&self) -> &TargetInput {
        &self.target
    }

    fn loader(&mut self, encoding: Encoding) -> PipelineResult<ModelInputLoader<'_>> {
        let clusterer = self.clusterer.as_deref().ok_or_else(|| {
            error!("No positive clusterer configured");
            PipelineError::invalid_parameter("positive clusterer not set")
        })?;
        let sampler = self.sampler.as_deref_mut().ok_or_else(|| {
            error!("No negative sampler configured");
            PipelineError::invalid_parameter("negative sampler not set")
        })?;

        Ok(ModelInputLoader::new(
            self.source.as_ref(),
            sampler,
            clusterer,
            &self.target,
            self.fingerprinter.as_ref(),
            encoding,
        )
        .exclude_all_positives(self.exclude_all_positives))
    }

    /// Assemble one classifier input per positive cluster.
    pub fn load_model_inputs(
        &mut self,
        encoding: Encoding,
        neg_sample_size_factor: usize,
    ) -> PipelineResult<(Vec<Cluster>, Vec<BinaryClassifierInput>)> {
        let mut loader = self.loader(encoding)?;
        loader.load(neg_sample_size_factor)?;
        Ok((loader.positive_clusters().to_vec(), loader.model_inputs().to_vec()))
    }

    /// Cluster the positives without sampling negatives.
    pub fn cluster_positives(&self) -> PipelineResult<Vec<Cluster>> {
        let clusterer = self
            .clusterer
            .as_deref()
            .ok_or_else(|| PipelineError::invalid_parameter("positive clusterer not set"))?;
        clusterer.find_clusters(self.source.fetch_bioactive_compounds(&self.target)?)
    }

    /// Evaluate `classifier` on every cluster's dataset.
    ///
    /// Clusters too small for a hold-out split are reported with no F1 and
    /// do not stop the others from being evaluated.
    pub fn evaluate_clusters(
        &mut self,
        classifier: &mut dyn BinaryClassifier,
        neg_sample_size_factor: usize,
        true_threshold: f32,
    ) -> PipelineResult<Vec<ClusterEvaluation>> {
        info!("Training and evaluating model");
        let (clusters, inputs) =
            self.load_model_inputs(classifier.expected_encoding(), neg_sample_size_factor)?;

        let mut report = Vec::with_capacity(inputs.len());
        for (cluster, input) in clusters.iter().zip(&inputs) {
            let f1 = if classifier.can_evaluate(input) {
                Some(classifier.evaluate(input, true_threshold)?)
            } else {
                warn!(
                    "Skipping cluster {}: {} positives and {} negatives are too few to split",
                    cluster.id(),
                    input.positives().len(),
                    input.negatives().len()
                );
                None
            };
            report.push(ClusterEvaluation {
                cluster_id: cluster.id(),
                positives: input.positives().len(),
                negatives: input.negatives().len(),
                f1,
            });
        }
        Ok(report)
    }

    /// F1 of every cluster large enough to evaluate, in cluster order.
    pub fn train_and_evaluate(
        &mut self,
        classifier: &mut dyn BinaryClassifier,
        neg_sample_size_factor: usize,
        true_threshold: f32,
    ) -> PipelineResult<Vec<f32>> {
        let f1_scores: Vec<f32> = self
            .evaluate_clusters(classifier, neg_sample_size_factor, true_threshold)?
            .into_iter()
            .filter_map(|evaluation| evaluation.f1)
            .collect();
        info!("F1: {:?}", f1_scores);
        Ok(f1_scores)
    }

    /// Train `classifier` on every row of the first cluster's dataset.
    pub fn train(
        &mut self,
        mut classifier: Box<dyn BinaryClassifier>,
        neg_sample_size_factor: usize,
    ) -> PipelineResult<Arc<dyn BinaryClassifier>> {
        info!("Training model for production");
        let (_, inputs) = self.load_model_inputs(classifier.expected_encoding(), neg_sample_size_factor)?;
        let first = inputs
            .first()
            .ok_or_else(|| PipelineError::invalid_parameter("no classifier inputs assembled"))?;

        classifier.train(first, &first.all_indices())?;
        Ok(Arc::from(classifier))
    }

    pub fn scoring_pipeline(&self, model: Arc<dyn BinaryClassifier>) -> PipelineResult<ScoringPipeline> {
        let context = ScoringContext::new(Arc::clone(&self.scoring_fingerprinter), model)?;
        ScoringPipeline::new(context, self.scoring)
    }

    /// Stream predictions for every compound in `library`, in library order.
    ///
    /// The library is read as the stream is polled. Records the library
    /// cannot read and compounds that cannot be scored are left out.
    ///
    /// # Errors
    /// An untrained model, invalid scoring options, or a library that cannot
    /// be opened.
    pub fn predict_stream<'a>(
        &self,
        model: Arc<dyn BinaryClassifier>,
        library: &'a dyn CompoundLibrary,
    ) -> PipelineResult<impl Stream<Item = Prediction> + Send + 'a> {
        let pipeline = self.scoring_pipeline(model)?;
        let candidates = library.fetch_all()?.filter_map(|record| match record {
            Ok(compound) => Some(compound),
            Err(e) => {
                warn!("Skipping unreadable library record: {}", e);
                None
            }
        });
        info!("Scoring library with {} workers", pipeline.options().workers);
        Ok(pipeline.predict(candidates))
    }

    /// Collected [`predict_stream`](Self::predict_stream).
    pub async fn predict(
        &self,
        model: Arc<dyn BinaryClassifier>,
        library: &dyn CompoundLibrary,
    ) -> PipelineResult<Vec<Prediction>> {
        let predictions: Vec<Prediction> = self.predict_stream(model, library)?.collect().await;
        info!("Scored {} candidates", predictions.len());
        Ok(predictions)
    }

    /// [`predict`](Self::predict), sorted by descending score.
    pub async fn sort_predicted(
        &self,
        model: Arc<dyn BinaryClassifier>,
        library: &dyn CompoundLibrary,
    ) -> PipelineResult<Vec<Prediction>> {
        Ok(sort_predictions(self.predict(model, library).await?))
    }

    pub fn load_positive_compounds(&mut self) -> PipelineResult<Vec<BioactiveCompound>> {
        info!("Loading positive compounds");
        self.source.fetch_bioactive_compounds(&self.target)?.collect()
    }
}
