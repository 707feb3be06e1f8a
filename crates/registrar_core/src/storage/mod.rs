//! Blob storage for attachment bytes.
//!
//! # Responsibility
//! - Abstract the physical content store (filesystem, memory, bucket).
//! - Validate storage keys before they reach a backend.
//!
//! # Invariants
//! - Keys are relative, `/`-separated, and never contain `..` segments.
//! - A missing blob is `BlobError::NotFound`, never an I/O error.

use thiserror::Error;

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("invalid blob key `{0}`")]
    InvalidKey(String),
    #[error("blob storage failure for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Content store for attachment bytes.
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any previous content.
    fn put(&self, key: &str, bytes: &[u8]) -> BlobResult<()>;

    fn get(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Removes `key`; `BlobError::NotFound` when absent.
    fn delete(&self, key: &str) -> BlobResult<()>;

    fn exists(&self, key: &str) -> BlobResult<bool>;
}

/// Rejects keys that could escape the store root.
pub fn validate_key(key: &str) -> BlobResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
        });
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_string()))
    }
}
