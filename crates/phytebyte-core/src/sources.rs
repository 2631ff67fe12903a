//! Bioactivity sources: where positive compounds come from.
//!
//! # Architecture
//!
//! ```text
//! BioactivitySource (trait)
//! └── fetch_bioactive_compounds(&TargetInput) -> one-shot iterator
//!
//! InMemoryBioactivitySource   // records held in memory, uid order
//! JsonlBioactivitySource      // records streamed from a .jsonl file
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::PipelineResult;
use crate::jsonl::JsonlRecords;
use crate::target::TargetInput;
use crate::types::BioactiveCompound;

/// One-shot stream of positives.
pub type BioactiveCompoundIter<'a> =
    Box<dyn Iterator<Item = PipelineResult<BioactiveCompound>> + Send + 'a>;

/// Query layer over a bioactivity database.
pub trait BioactivitySource: Send + Sync {
    /// Stream compounds matching `target`, each carrying only its qualifying
    /// activities.
    ///
    /// # Errors
    /// `Source` if the query cannot be started. Per-record failures are
    /// yielded by the iterator.
    fn fetch_bioactive_compounds<'a>(
        &'a self,
        target: &'a TargetInput,
    ) -> PipelineResult<BioactiveCompoundIter<'a>>;
}

/// Source over records held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBioactivitySource {
    compounds: Vec<BioactiveCompound>,
}

impl InMemoryBioactivitySource {
    pub fn new(mut compounds: Vec<BioactiveCompound>) -> Self {
        compounds.sort_by_key(|c| c.uid);
        Self { compounds }
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }
}

impl BioactivitySource for InMemoryBioactivitySource {
    fn fetch_bioactive_compounds<'a>(
        &'a self,
        target: &'a TargetInput,
    ) -> PipelineResult<BioactiveCompoundIter<'a>> {
        debug!(
            "Querying {} in-memory records for targets {:?}",
            self.compounds.len(),
            target.gene_targets
        );
        Ok(Box::new(
            self.compounds
                .iter()
                .filter_map(move |c| target.select(c))
                .map(Ok),
        ))
    }
}

/// Source streaming records from a JSON Lines file, one `BioactiveCompound`
/// per line, in file order.
#[derive(Debug, Clone)]
pub struct JsonlBioactivitySource {
    path: PathBuf,
}

impl JsonlBioactivitySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BioactivitySource for JsonlBioactivitySource {
    fn fetch_bioactive_compounds<'a>(
        &'a self,
        target: &'a TargetInput,
    ) -> PipelineResult<BioactiveCompoundIter<'a>> {
        info!("Streaming bioactive compounds from {}", self.path.display());
        let records = JsonlRecords::<BioactiveCompound>::open(&self.path)?;
        Ok(Box::new(records.filter_map(move |record| match record {
            Ok(c) => target.select(&c).map(Ok),
            Err(e) => Some(Err(e)),
        })))
    }
}
