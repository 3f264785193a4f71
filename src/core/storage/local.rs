//! Local Filesystem Backend
//!
//! One file per key under a base directory. Writes go through the atomic
//! temp-file + rename path so a crash mid-write never leaves a collection
//! half-replaced. An optional byte quota mirrors the bounded namespace the
//! browser build of this app lived in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::fs::{atomic_write_bytes, validate_key_component};
use crate::core::CoreError;

use super::backend::{BackendError, BackendResult, KvBackend};

/// File-per-key backend rooted at a directory
#[derive(Debug)]
pub struct LocalBackend {
    base_dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl LocalBackend {
    /// Creates an unbounded backend rooted at `base_dir`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            quota_bytes: None,
        }
    }

    /// Creates a backend that rejects writes past `quota_bytes` total.
    pub fn with_quota(base_dir: PathBuf, quota_bytes: u64) -> Self {
        Self {
            base_dir,
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the backing directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> BackendResult<PathBuf> {
        validate_key_component(key, "store key").map_err(|reason| BackendError::InvalidKey {
            key: key.to_string(),
            reason,
        })?;
        Ok(self.base_dir.join(key))
    }

    /// Live entries only: in-flight `.tmp`/`.bak` siblings and dotfiles are
    /// not part of the namespace.
    fn live_entries(&self) -> BackendResult<Vec<(String, u64)>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name.ends_with(".tmp") || name.ends_with(".bak") {
                continue;
            }
            entries.push((name.to_string(), entry.metadata()?.len()));
        }
        Ok(entries)
    }

    fn used(&self) -> BackendResult<u64> {
        Ok(self
            .live_entries()?
            .iter()
            .map(|(name, len)| name.len() as u64 + len)
            .sum())
    }
}

fn write_error(e: CoreError) -> BackendError {
    match e {
        CoreError::IoError(io) => BackendError::Io(io),
        other => BackendError::Io(std::io::Error::other(other.to_string())),
    }
}

impl KvBackend for LocalBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> BackendResult<()> {
        let path = self.path_for(key)?;

        if let Some(quota) = self.quota_bytes {
            let existing = if path.exists() {
                key.len() as u64 + fs::metadata(&path)?.len()
            } else {
                0
            };
            let attempted = (key.len() + value.len()) as u64;
            let used = self.used()?;
            if used - existing + attempted > quota {
                return Err(BackendError::QuotaExceeded {
                    attempted,
                    used,
                    quota,
                });
            }
        }

        atomic_write_bytes(&path, value.as_bytes()).map_err(write_error)
    }

    fn remove(&mut self, key: &str) -> BackendResult<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        Ok(self
            .live_entries()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn usage_bytes(&self) -> BackendResult<u64> {
        self.used()
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.quota_bytes
    }
}
