//! Encoding cache commands
//!
//! # Commands
//!
//! - `cache build`: encode a library into the configured cache directory
//! - `cache inspect`: list persisted tables with entry counts

use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use phytebyte_core::jsonl::read_all;
use phytebyte_core::{CandidateCompound, Config};
use phytebyte_encoding::{
    CacheKey, Encoding, EncodingCache, EncodingError, FileEncodingCache, Fingerprinter,
};

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Encode every structure of a library and persist it
    Build(BuildArgs),

    /// Report the tables persisted in the cache directory
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Compounds to encode (JSON Lines of candidate compounds)
    #[arg(long)]
    pub library: std::path::PathBuf,

    /// Encoding to build; repeat for several. Defaults to all
    #[arg(long = "encoding")]
    pub encodings: Vec<Encoding>,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

/// Outcome of building one table.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub key: CacheKey,
    pub stored: usize,
    pub failed: usize,
}

/// One persisted table. `entries` is `None` when the file failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub key: CacheKey,
    pub bytes: u64,
    pub entries: Option<usize>,
    pub status: String,
}

pub fn handle_cache_command(config: &Config, cmd: CacheCommands) -> i32 {
    match cmd {
        CacheCommands::Build(args) => handle_build(config, args),
        CacheCommands::Inspect(args) => handle_inspect(config, args),
    }
}

fn handle_build(config: &Config, args: BuildArgs) -> i32 {
    let result = config
        .fingerprint
        .kind
        .create(config.fingerprint.dimension, config.fingerprint.radius)
        .context("failed to create fingerprinter")
        .and_then(|fp| build_tables(&config.cache.dir, &args.library, &args.encodings, fp.as_ref()))
        .and_then(|reports| {
            if args.json {
                let value: Vec<Value> = reports
                    .iter()
                    .map(|r| json!({ "table": r.key.file_stem(), "stored": r.stored, "failed": r.failed }))
                    .collect();
                Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
            } else {
                Ok(format_build(&reports))
            }
        });

    match result {
        Ok(out) => {
            print!("{}", out);
            info!("Cache build finished in {}", config.cache.dir.display());
            0
        }
        Err(e) => {
            error!("Cache build failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn handle_inspect(config: &Config, args: InspectArgs) -> i32 {
    let result = inspect_tables(&config.cache.dir).and_then(|reports| {
        if args.json {
            let value: Vec<Value> = reports
                .iter()
                .map(|r| {
                    json!({
                        "table": r.key.file_stem(),
                        "fingerprint_type": r.key.fingerprint_type,
                        "encoding": r.key.encoding.as_str(),
                        "bytes": r.bytes,
                        "entries": r.entries,
                        "status": r.status,
                    })
                })
                .collect();
            Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
        } else {
            Ok(format_inspection(&config.cache.dir, &reports))
        }
    });

    match result {
        Ok(out) => {
            print!("{}", out);
            0
        }
        Err(e) => {
            error!("Cache inspection failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Encode the distinct structures of `library` under each encoding and persist them.
///
/// Existing tables are extended, not replaced.
pub fn build_tables(
    dir: &Path,
    library: &Path,
    encodings: &[Encoding],
    fingerprinter: &dyn Fingerprinter,
) -> Result<Vec<BuildReport>> {
    let compounds: Vec<CandidateCompound> = read_all(library)?;
    let mut seen = HashSet::new();
    let structures: Vec<String> = compounds
        .into_iter()
        .filter_map(|c| seen.insert(c.smiles.clone()).then_some(c.smiles))
        .collect();
    info!("Encoding {} distinct structures from {}", structures.len(), library.display());

    let encodings: Vec<Encoding> = if encodings.is_empty() {
        Encoding::all().to_vec()
    } else {
        encodings.to_vec()
    };

    let mut cache = FileEncodingCache::new(dir);
    let mut reports = Vec::with_capacity(encodings.len());
    for encoding in encodings {
        match cache.load(fingerprinter.fingerprint_type(), encoding) {
            Ok(()) | Err(EncodingError::CacheNotInitialized { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        let update = cache.update(&structures, fingerprinter, encoding)?;
        if !update.is_complete() {
            warn!("{} structures could not be encoded as {}", update.failed.len(), encoding);
        }
        reports.push(BuildReport {
            key: CacheKey::new(fingerprinter.fingerprint_type(), encoding),
            stored: update.stored,
            failed: update.failed.len(),
        });
    }
    cache.write()?;
    Ok(reports)
}

/// Load every persisted table under `dir` and report its size.
pub fn inspect_tables(dir: &Path) -> Result<Vec<TableReport>> {
    let keys = FileEncodingCache::new(dir).persisted_keys()?;

    let mut reports = Vec::with_capacity(keys.len());
    for key in keys {
        let mut cache = FileEncodingCache::new(dir);
        let bytes = std::fs::metadata(cache.path_for(&key)).map(|m| m.len()).unwrap_or(0);
        let (entries, status) = match cache.load(&key.fingerprint_type, key.encoding) {
            Ok(()) => (Some(cache.len()), "ok".to_string()),
            Err(e) => {
                warn!("Table {} failed to load: {}", key.file_stem(), e);
                (None, e.to_string())
            }
        };
        reports.push(TableReport {
            key,
            bytes,
            entries,
            status,
        });
    }
    Ok(reports)
}

fn format_build(reports: &[BuildReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Encoding Cache Build");
    let _ = writeln!(out, "====================\n");
    for r in reports {
        let _ = writeln!(out, "  {:<28}  stored {:>7}  failed {:>5}", r.key.file_stem(), r.stored, r.failed);
    }
    out
}

fn format_inspection(dir: &Path, reports: &[TableReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Encoding Cache: {}", dir.display());
    let _ = writeln!(out, "===============\n");
    if reports.is_empty() {
        let _ = writeln!(out, "No tables persisted yet.");
        let _ = writeln!(out, "Tip: run `phytebyte cache build --library <file>`");
        return out;
    }
    for r in reports {
        let entries = r.entries.map_or_else(|| "-".to_string(), |n| n.to_string());
        let _ = writeln!(
            out,
            "  {:<28}  {:>9} entries  {:>10} bytes  {}",
            r.key.file_stem(),
            entries,
            r.bytes,
            r.status
        );
    }
    out
}
