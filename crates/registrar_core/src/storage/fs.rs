//! Filesystem blob store.

use super::{validate_key, BlobError, BlobResult, BlobStore};
use log::warn;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores blobs as files below a root directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// failed write never leaves a partial blob under the final key.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates the root directory when missing.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a key; the key must be valid.
    pub fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> BlobResult<()> {
        let path = self.path_for(key)?;
        let io_error = |source| BlobError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let temp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        if let Err(err) = std::fs::write(&temp, bytes) {
            let _ = std::fs::remove_file(&temp);
            return Err(io_error(err));
        }
        if let Err(err) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(io_error(err));
        }
        Ok(())
    }

    fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.path_for(key)?;
        std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
            _ => BlobError::Io {
                key: key.to_string(),
                source: err,
            },
        })
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        std::fs::remove_file(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
            _ => BlobError::Io {
                key: key.to_string(),
                source: err,
            },
        })?;

        // Drop the per-owner directory once its last file is gone.
        if let Some(parent) = path.parent().filter(|parent| *parent != self.root) {
            let is_empty = std::fs::read_dir(parent)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if is_empty {
                if let Err(err) = std::fs::remove_dir(parent) {
                    warn!(
                        "event=blob_dir_cleanup module=storage status=error key={} error={}",
                        key, err
                    );
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> BlobResult<bool> {
        let path = self.path_for(key)?;
        path.try_exists().map_err(|source| BlobError::Io {
            key: key.to_string(),
            source,
        })
    }
}
