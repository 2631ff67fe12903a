//! Configuration management for PhyteByte.

use std::path::{Path, PathBuf};
use std::time::Duration;

use phytebyte_encoding::FingerprintKind;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierKind, ClassifierParams};
use crate::clustering::{ClusteringStrategy, DEFAULT_SIMILARITY_THRESHOLD};
use crate::error::{PipelineError, PipelineResult};
use crate::scoring::{default_workers, ScoringOptions};
use crate::sampling::SamplingStrategy;
use crate::target::TargetInput;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub target: TargetInput,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{PHYTEBYTE_ENV}.toml (environment-specific)
    /// 3. Environment variables with PHYTEBYTE__ prefix, `__` between keys
    ///    (e.g. `PHYTEBYTE__SAMPLING__SEED=7`)
    pub fn load() -> PipelineResult<Self> {
        let env = std::env::var("PHYTEBYTE_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("PHYTEBYTE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.fingerprint.dimension == 0 {
            return Err(PipelineError::Config(
                "fingerprint.dimension must be greater than 0".into(),
            ));
        }

        let threshold = self.clustering.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PipelineError::Config(format!(
                "clustering.similarity_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        if self.sampling.neg_sample_size_factor == 0 {
            return Err(PipelineError::Config(
                "sampling.neg_sample_size_factor must be greater than 0".into(),
            ));
        }

        if self.scoring.workers == 0 {
            return Err(PipelineError::Config(
                "scoring.workers must be greater than 0".into(),
            ));
        }
        if self.scoring.item_timeout_ms == 0 {
            return Err(PipelineError::Config(
                "scoring.item_timeout_ms must be greater than 0".into(),
            ));
        }

        let t = self.classifier.true_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(PipelineError::Config(format!(
                "classifier.true_threshold must be in (0, 1], got {}",
                t
            )));
        }
        if self.classifier.epochs == 0 {
            return Err(PipelineError::Config(
                "classifier.epochs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Encoding cache settings. `dir` holds one file per (fingerprint, encoding).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("./data/encoding-cache"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub kind: FingerprintKind,
    pub dimension: usize,
    pub radius: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            kind: FingerprintKind::SmilesHash,
            dimension: phytebyte_encoding::hashed::DEFAULT_DIMENSION,
            radius: phytebyte_encoding::hashed::DEFAULT_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub strategy: ClusteringStrategy,
    pub similarity_threshold: f32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: ClusteringStrategy::Butina,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub strategy: SamplingStrategy,
    pub seed: u64,
    pub neg_sample_size_factor: usize,
    /// Exclude every positive from every cluster's negatives.
    pub exclude_all_positives: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::Random,
            seed: 42,
            neg_sample_size_factor: 3,
            exclude_all_positives: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub workers: usize,
    pub item_timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            item_timeout_ms: 30_000,
        }
    }
}

impl ScoringConfig {
    pub fn options(&self) -> ScoringOptions {
        ScoringOptions {
            workers: self.workers,
            item_timeout: Duration::from_millis(self.item_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    /// Probability at or above which a compound is called active.
    pub true_threshold: f32,
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let params = ClassifierParams::default();
        Self {
            kind: ClassifierKind::LogisticRegression,
            epochs: params.epochs,
            learning_rate: params.learning_rate,
            l2: params.l2,
            true_threshold: 0.5,
            seed: params.seed,
        }
    }
}

impl ClassifierConfig {
    pub fn params(&self) -> ClassifierParams {
        ClassifierParams {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            l2: self.l2,
            seed: self.seed,
        }
    }
}
