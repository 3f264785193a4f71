//! Engagement Analytics Module
//!
//! Per-video view counts and watch-completion aggregates.

mod models;

pub use models::*;
