//! ScreenReel Core Type Definitions
//!
//! Defines fundamental types used throughout the storage core.

// =============================================================================
// ID Types
// =============================================================================

/// Video unique identifier (ULID)
pub type VideoId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;
