//! ScreenReel Error Definitions
//!
//! Defines error types used throughout the storage core.
//!
//! Absent lookups are not errors: read operations return `Ok(None)` for an
//! unknown id, and the analytics mutators silently ignore unknown ids.

use thiserror::Error;

use super::storage::backend::BackendError;

/// Storage core error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Capacity Errors
    // =========================================================================
    /// `create_video` failed even after the eviction-and-retry pass.
    /// No partial write remains when this is returned.
    #[error("Storage capacity exceeded: {0}")]
    CapacityExceeded(String),

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Upload metadata rejected by the opt-in `validate_uploads` check.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A stored collection or blob entry failed to parse.
    #[error("Stored data corrupted: {0}")]
    Corrupted(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage core result type
pub type CoreResult<T> = Result<T, CoreError>;
