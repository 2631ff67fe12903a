use std::collections::HashSet;

use phytebyte_encoding::{EncodedCompound, Encoding, Fingerprinter};
use tracing::{error, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::library::CandidateIter;

/// Lazy sequence of encoded negatives for one cluster.
///
/// Yields exactly `requested` compounds. If the candidate stream ends first,
/// the next item is `InsufficientCandidates` and the sequence ends. Excluded,
/// repeated and unencodable candidates are skipped.
pub struct NegativeSample<'a> {
    candidates: CandidateIter<'a>,
    fingerprinter: &'a dyn Fingerprinter,
    encoding: Encoding,
    excluded: HashSet<String>,
    seen: HashSet<String>,
    requested: usize,
    produced: usize,
    skipped: usize,
    finished: bool,
}

impl<'a> NegativeSample<'a> {
    pub(crate) fn new(
        candidates: CandidateIter<'a>,
        fingerprinter: &'a dyn Fingerprinter,
        encoding: Encoding,
        excluded: HashSet<String>,
        requested: usize,
    ) -> Self {
        Self {
            candidates,
            fingerprinter,
            encoding,
            excluded,
            seen: HashSet::new(),
            requested,
            produced: 0,
            skipped: 0,
            finished: requested == 0,
        }
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Candidates passed over so far because they could not be encoded.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Drain the sample into a vector of exactly `requested` compounds.
    ///
    /// # Errors
    /// The first error the sequence yields.
    pub fn materialize(self) -> PipelineResult<Vec<EncodedCompound>> {
        self.collect()
    }
}

impl Iterator for NegativeSample<'_> {
    type Item = PipelineResult<EncodedCompound>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let candidate = match self.candidates.next() {
                Some(Ok(c)) => c,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    error!(
                        "Negative pool exhausted: requested {}, produced {}",
                        self.requested, self.produced
                    );
                    return Some(Err(PipelineError::InsufficientCandidates {
                        requested: self.requested,
                        produced: self.produced,
                    }));
                }
            };

            if self.excluded.contains(&candidate.smiles) || !self.seen.insert(candidate.smiles.clone()) {
                continue;
            }

            match self.fingerprinter.encode(&candidate.smiles, self.encoding) {
                Ok(encoded) => {
                    self.produced += 1;
                    if self.produced == self.requested {
                        self.finished = true;
                    }
                    return Some(Ok(encoded));
                }
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping negative candidate {}: {}", candidate.uid, e);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            // Plus one for a possible trailing InsufficientCandidates.
            (0, Some(self.requested - self.produced + 1))
        }
    }
}
