//! ScreenReel Storage Core
//!
//! Object store and analytics ledger for a screen-recording demo app:
//! capture a screen, trim it, "upload" it here, watch it on a share page
//! that reports view counts and watch-completion percentages.
//!
//! The service persists three keyed collections in a text-only key-value
//! namespace it owns exclusively: the video record list, one blob entry per
//! recording, and a map of per-video analytics. Capacity pressure is handled
//! by evicting the oldest recordings first.
//!
//! Construct a [`StorageService`] once at startup and pass it by reference to
//! whatever drives it (uploader, watch page, library listing); there is no
//! ambient global state.

pub mod core;

pub use crate::core::{
    analytics::{AnalyticsRecord, CompletionDataPoint},
    settings::StoreSettings,
    storage::{KvBackend, LocalBackend, MemoryBackend, StorageService, StorageUsage},
    videos::{NewVideoMetadata, VideoRecord},
    CoreError, CoreResult, TimeSec, VideoId,
};
