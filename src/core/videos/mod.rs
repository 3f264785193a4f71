//! Video Record Module
//!
//! Models for uploaded screen recordings and their share links.

mod models;

pub use models::*;
