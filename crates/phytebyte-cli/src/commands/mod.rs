//! CLI command handlers
//!
//! # Modules
//!
//! - `clusters`: positive clustering report
//! - `evaluate`: per-cluster hold-out F1
//! - `predict`: library ranking
//! - `cache`: encoding cache build and inspection

pub mod cache;
pub mod clusters;
pub mod evaluate;
pub mod predict;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use phytebyte_core::{
    Config, JsonlBioactivitySource, JsonlCompoundLibrary, PhyteByte, PipelineResult, TargetInput,
};
use phytebyte_encoding::{CachingFingerprinter, FileEncodingCache, Fingerprinter};

/// `--config` file, or the layered default sources.
pub fn load_config(path: Option<&Path>) -> PipelineResult<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
}

/// Positives input shared by the modelling commands.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Bioactivity records (JSON Lines)
    #[arg(long)]
    pub bioactivity: PathBuf,

    /// Gene target; repeat for several. Overrides `target.gene_targets`
    #[arg(long = "gene")]
    pub genes: Vec<String>,
}

impl TargetArgs {
    pub fn target(&self, config: &Config) -> TargetInput {
        let mut target = config.target.clone();
        if !self.genes.is_empty() {
            target.gene_targets = self.genes.clone();
        }
        target
    }

    pub fn source(&self) -> Arc<JsonlBioactivitySource> {
        Arc::new(JsonlBioactivitySource::new(&self.bioactivity))
    }
}

/// Configured fingerprinter, wrapped by the file cache when enabled.
pub struct Fingerprinting {
    base: Arc<dyn Fingerprinter>,
    caching: Option<CachingFingerprinter>,
}

impl Fingerprinting {
    pub fn from_config(config: &Config) -> Result<Self> {
        let fp = &config.fingerprint;
        let base = fp
            .kind
            .create(fp.dimension, fp.radius)
            .context("failed to create fingerprinter")?;

        let caching = if config.cache.enabled {
            let caching = CachingFingerprinter::new(
                Arc::clone(&base),
                Box::new(FileEncodingCache::new(&config.cache.dir)),
            );
            caching
                .warm()
                .with_context(|| format!("failed to load encoding cache from {}", config.cache.dir.display()))?;
            info!("Encoding cache enabled at {}", config.cache.dir.display());
            Some(caching)
        } else {
            None
        };

        Ok(Self { base, caching })
    }

    /// Fingerprinter that fills the cache on miss.
    pub fn writer(&self) -> Arc<dyn Fingerprinter> {
        match &self.caching {
            Some(caching) => Arc::new(caching.clone()),
            None => Arc::clone(&self.base),
        }
    }

    /// Fingerprinter that reads the cache but never writes it.
    pub fn reader(&self) -> Arc<dyn Fingerprinter> {
        match &self.caching {
            Some(caching) => Arc::new(caching.frozen()),
            None => Arc::clone(&self.base),
        }
    }

    /// Persist encodings computed so far. Failure only loses cache entries.
    pub fn flush(&self) {
        if let Some(caching) = &self.caching {
            if let Err(e) = caching.flush() {
                warn!("Failed to persist encoding cache: {}", e);
            }
        }
    }
}

/// Facade wired from `config` with the given inputs.
pub fn build_phytebyte(
    config: &Config,
    target: &TargetArgs,
    negatives: &Path,
    fingerprinter: Arc<dyn Fingerprinter>,
) -> Result<PhyteByte> {
    let mut config = config.clone();
    config.target = target.target(&config);

    let phytebyte = PhyteByte::from_config(
        &config,
        target.source(),
        Arc::new(JsonlCompoundLibrary::new(negatives)),
        fingerprinter,
    )?;
    Ok(phytebyte)
}
