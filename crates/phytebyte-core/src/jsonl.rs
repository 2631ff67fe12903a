//! JSON Lines record streaming shared by file-backed sources and libraries.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{PipelineError, PipelineResult};

/// Lazily parsed records from a `.jsonl` file. Blank lines are skipped.
pub struct JsonlRecords<T> {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonlRecords<T> {
    /// Open `path` for streaming.
    ///
    /// # Errors
    /// `Source` if the file cannot be opened.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let file = File::open(path).map_err(|e| {
            error!("Cannot open {}: {}", path.display(), e);
            PipelineError::source(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            _record: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonlRecords<T> {
    type Item = PipelineResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(PipelineError::Io(e))),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                PipelineError::source(format!(
                    "{}:{}: malformed record: {}",
                    self.path.display(),
                    self.line_no,
                    e
                ))
            }));
        }
    }
}

/// Read every record, failing on the first malformed line.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    JsonlRecords::open(path)?.collect()
}
