//! File-backed encoding cache.
//!
//! One file per (fingerprint type, encoding) pair, named `{fp_type}_{encoding}.pbec`
//! inside the cache directory.
//!
//! # File Format
//!
//! - Header: magic bytes `PBEC`, version u8, entry_count u64 (LE)
//! - Body: bincode-serialized `Vec<(String, Vec<f32>)>`, sorted by structure
//! - Footer: xxhash64 checksum of all preceding bytes
//!
//! Writes go to a `.tmp` sibling and are renamed into place, so readers never
//! observe a half-written table.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};
use xxhash_rust::xxh64::xxh64;

use super::types::{CacheKey, CacheUpdate, EncodingTable, TableSet};
use super::EncodingCache;
use crate::error::{EncodingError, EncodingResult};
use crate::provider::Fingerprinter;
use crate::types::{EncodedCompound, Encoding};

const CACHE_MAGIC: [u8; 4] = *b"PBEC";
const CACHE_VERSION: u8 = 1;
const CACHE_EXTENSION: &str = "pbec";

/// magic(4) + version(1) + count(8) + checksum(8)
const MIN_FILE_SIZE: usize = 21;

/// Encoding cache persisted as one checksummed bincode file per table.
#[derive(Debug)]
pub struct FileEncodingCache {
    dir: PathBuf,
    tables: TableSet,
}

impl FileEncodingCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: TableSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the table for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.file_stem(), CACHE_EXTENSION))
    }

    /// Keys with a persisted table in the cache directory.
    ///
    /// # Errors
    /// `IoError` if the directory exists but cannot be listed.
    pub fn persisted_keys(&self) -> EncodingResult<Vec<CacheKey>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Fingerprint types may themselves contain '_'; the encoding never does.
            if let Some((fp, enc)) = stem.rsplit_once('_') {
                if let Ok(encoding) = enc.parse::<Encoding>() {
                    keys.push(CacheKey::new(fp, encoding));
                }
            }
        }
        keys.sort_by(|a, b| a.file_stem().cmp(&b.file_stem()));
        Ok(keys)
    }

    fn persist_table(&self, key: &CacheKey, table: &EncodingTable) -> EncodingResult<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|e| {
            error!("FileEncodingCache write error: cannot create {:?}: {}", self.dir, e);
            EncodingError::cache(format!("Failed to create cache directory: {}", e))
        })?;

        let data = encode_table(table)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &data).map_err(|e| {
            error!("FileEncodingCache write error: write failed: {}", e);
            EncodingError::cache(format!("Failed to write cache file: {}", e))
        })?;
        fs::rename(&temp_path, &path).map_err(|e| {
            error!("FileEncodingCache write error: rename failed: {}", e);
            EncodingError::cache(format!("Failed to rename temp cache file: {}", e))
        })?;

        info!(
            "Persisted {} encodings to {}",
            table.len(),
            path.display()
        );
        Ok(())
    }
}

/// Serialize a table into the on-disk format.
fn encode_table(table: &EncodingTable) -> EncodingResult<Vec<u8>> {
    let entries: Vec<(&String, &Vec<f32>)> = table.iter().collect();

    let mut data = Vec::new();
    data.extend_from_slice(&CACHE_MAGIC);
    data.push(CACHE_VERSION);
    data.extend_from_slice(&(entries.len() as u64).to_le_bytes());

    let body = bincode::serialize(&entries).map_err(|e| {
        error!("FileEncodingCache write error: serialization failed: {}", e);
        EncodingError::SerializationError {
            message: format!("bincode serialization failed: {}", e),
        }
    })?;
    data.extend_from_slice(&body);

    let checksum = xxh64(&data, 0);
    data.extend_from_slice(&checksum.to_le_bytes());
    Ok(data)
}

/// Parse and verify the on-disk format.
fn decode_table(data: &[u8]) -> EncodingResult<EncodingTable> {
    if data.len() < MIN_FILE_SIZE {
        error!("FileEncodingCache load error: file too small");
        return Err(EncodingError::cache("Cache file too small"));
    }

    let checksum_offset = data.len() - 8;
    let stored_checksum = u64::from_le_bytes(
        data[checksum_offset..]
            .try_into()
            .map_err(|_| EncodingError::cache("Invalid checksum bytes"))?,
    );
    let computed_checksum = xxh64(&data[..checksum_offset], 0);
    if stored_checksum != computed_checksum {
        error!(
            "FileEncodingCache load error: checksum mismatch (stored={:#x}, computed={:#x})",
            stored_checksum, computed_checksum
        );
        return Err(EncodingError::cache(format!(
            "Checksum mismatch: stored={:#x}, computed={:#x}",
            stored_checksum, computed_checksum
        )));
    }

    if data[0..4] != CACHE_MAGIC {
        error!("FileEncodingCache load error: invalid magic bytes");
        return Err(EncodingError::cache("Invalid cache file magic bytes"));
    }

    let version = data[4];
    if version != CACHE_VERSION {
        error!(
            "FileEncodingCache load error: unsupported version {} (expected {})",
            version, CACHE_VERSION
        );
        return Err(EncodingError::cache(format!(
            "Unsupported cache version {} (expected {})",
            version, CACHE_VERSION
        )));
    }

    let entry_count = u64::from_le_bytes(
        data[5..13]
            .try_into()
            .map_err(|_| EncodingError::cache("Invalid entry count bytes"))?,
    );

    let entries: Vec<(String, Vec<f32>)> =
        bincode::deserialize(&data[13..checksum_offset]).map_err(|e| {
            error!("FileEncodingCache load error: deserialization failed: {}", e);
            EncodingError::SerializationError {
                message: format!("bincode deserialization failed: {}", e),
            }
        })?;

    if entries.len() as u64 != entry_count {
        error!(
            "FileEncodingCache load error: entry count mismatch (header={}, actual={})",
            entry_count,
            entries.len()
        );
        return Err(EncodingError::cache(format!(
            "Entry count mismatch: header={}, actual={}",
            entry_count,
            entries.len()
        )));
    }

    Ok(entries.into_iter().collect())
}

impl EncodingCache for FileEncodingCache {
    fn load(&mut self, fingerprint_type: &str, encoding: Encoding) -> EncodingResult<()> {
        let key = CacheKey::new(fingerprint_type, encoding);
        let path = self.path_for(&key);
        if !path.exists() {
            debug!("No cache file at {}", path.display());
            return Err(EncodingError::not_initialized(fingerprint_type, encoding));
        }

        let data = fs::read(&path).map_err(|e| {
            error!("FileEncodingCache load error: read failed: {}", e);
            EncodingError::cache(format!("Failed to read cache file: {}", e))
        })?;
        let table = decode_table(&data)?;

        info!("Loaded {} encodings from {}", table.len(), path.display());
        self.tables.install(key, table);
        Ok(())
    }

    fn get(
        &self,
        structures: &[String],
        fingerprint_type: &str,
        encoding: Encoding,
    ) -> EncodingResult<Vec<Option<EncodedCompound>>> {
        self.tables
            .get(&CacheKey::new(fingerprint_type, encoding), structures)
    }

    fn update(
        &mut self,
        structures: &[String],
        fingerprinter: &dyn Fingerprinter,
        encoding: Encoding,
    ) -> EncodingResult<CacheUpdate> {
        let key = CacheKey::new(fingerprinter.fingerprint_type(), encoding);
        if !self.tables.contains_key(&key) && self.path_for(&key).exists() {
            // A later write must not drop entries already on disk.
            self.load(&key.fingerprint_type, encoding)?;
        }
        Ok(self.tables.update(structures, fingerprinter, encoding))
    }

    fn write(&mut self) -> EncodingResult<()> {
        for (key, table) in self.tables.dirty_tables() {
            self.persist_table(key, table)?;
        }
        self.tables.mark_clean();
        Ok(())
    }

    fn clear(&mut self) {
        self.tables.clear();
    }

    fn is_loaded(&self, fingerprint_type: &str, encoding: Encoding) -> bool {
        self.tables
            .contains_key(&CacheKey::new(fingerprint_type, encoding))
    }

    fn len(&self) -> usize {
        self.tables.len()
    }
}
