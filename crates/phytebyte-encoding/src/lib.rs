//! Compound fingerprinting and encoding cache for PhyteByte.
//!
//! # Architecture
//!
//! ```text
//! structure string ──► Fingerprinter ──► EncodedCompound (Dense | BitArray)
//!                          ▲
//!                 CachingFingerprinter ──► EncodingCache (memory | file)
//! ```
//!
//! Every fingerprinter is deterministic, so an encoding can always be
//! recomputed; the cache only saves the work.

pub mod cache;
pub mod caching;
pub mod error;
pub mod hashed;
pub mod provider;
pub mod smiles;
pub mod types;

pub use cache::{
    CacheKey, CacheUpdate, EncodingCache, EncodingTable, FileEncodingCache,
    InMemoryEncodingCache,
};
pub use caching::CachingFingerprinter;
pub use error::{EncodingError, EncodingResult};
pub use hashed::HashedSmilesFingerprinter;
pub use provider::{FingerprintKind, Fingerprinter};
pub use types::{tanimoto, EncodedCompound, Encoding};
