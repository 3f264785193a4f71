//! Key-Value Backend
//!
//! Abstraction over the text-only key-value namespace the storage service
//! owns exclusively (the browser build of this app kept everything in
//! `window.localStorage`). Backends enforce an optional byte quota the way
//! local storage does: a write that would push the namespace over quota is
//! rejected whole, leaving the prior value untouched.

use std::collections::HashMap;

use thiserror::Error;

/// Backend error types
#[derive(Error, Debug)]
pub enum BackendError {
    /// A write would exceed the configured byte quota. The entry it targeted
    /// is unchanged.
    #[error("quota exceeded: {attempted}-byte write over a {quota}-byte quota ({used} in use)")]
    QuotaExceeded {
        attempted: u64,
        used: u64,
        quota: u64,
    },

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend result type
pub type BackendResult<T> = Result<T, BackendError>;

/// Text-only key-value store with local-storage quota semantics.
///
/// The storage service performs whole-collection read-modify-write cycles on
/// top of this trait; backends only need per-entry atomicity.
pub trait KvBackend {
    /// Returns the value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Sets `key` to `value`. On a quota rejection the prior value (or
    /// absence) is preserved.
    fn set(&mut self, key: &str, value: &str) -> BackendResult<()>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str) -> BackendResult<()>;

    /// Lists every stored key, in no particular order.
    fn keys(&self) -> BackendResult<Vec<String>>;

    /// Bytes currently consumed by stored keys and values.
    fn usage_bytes(&self) -> BackendResult<u64>;

    /// Configured byte quota, if any.
    fn quota_bytes(&self) -> Option<u64>;
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-process backend, the direct analog of the browser's local storage.
///
/// Primary backend for tests; also useful for ephemeral demo sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    quota_bytes: Option<u64>,
}

impl MemoryBackend {
    /// Creates an unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that rejects writes past `quota_bytes` total.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entry_cost(key: &str, value: &str) -> u64 {
        (key.len() + value.len()) as u64
    }

    fn used(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| Self::entry_cost(k, v))
            .sum()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> BackendResult<()> {
        if let Some(quota) = self.quota_bytes {
            let existing = self
                .entries
                .get(key)
                .map(|v| Self::entry_cost(key, v))
                .unwrap_or(0);
            let attempted = Self::entry_cost(key, value);
            let used = self.used();
            if used - existing + attempted > quota {
                return Err(BackendError::QuotaExceeded {
                    attempted,
                    used,
                    quota,
                });
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> BackendResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> BackendResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn usage_bytes(&self) -> BackendResult<u64> {
        Ok(self.used())
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.quota_bytes
    }
}
