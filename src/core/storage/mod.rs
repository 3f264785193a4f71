//! Object Store & Analytics Ledger
//!
//! Persists screen recordings as three keyed collections in a text-only
//! key-value namespace the service owns exclusively:
//!
//! - `videos`: JSON list of [`VideoRecord`], in insertion order
//! - `blob.<id>`: one base64 data-URL entry per recording payload
//! - `analytics`: JSON map from video id to [`AnalyticsRecord`]
//!
//! The three entries for one recording form a single logical unit: the
//! analytics aggregate is zero-initialized when the record is created and
//! destroyed when it is deleted, and a blob never outlives its record.
//!
//! Every mutation is a whole-collection read-modify-write cycle with no
//! locking and no isolation. Two processes sharing one backend interleave at
//! whole-snapshot granularity: the last writer's snapshot wins and the other
//! writer's concurrent changes are silently lost. That is an accepted
//! limitation of a single-session demo store, documented here so nobody
//! "fixes" it and changes the observable contract.
//!
//! Capacity pressure is handled inside [`StorageService::create_video`]:
//! evict oldest-first so that, counting the incoming recording, at most
//! `retained_videos` remain, then retry the write exactly once.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::core::analytics::AnalyticsRecord;
use crate::core::settings::StoreSettings;
use crate::core::videos::{NewVideoMetadata, VideoRecord};
use crate::core::{CoreError, CoreResult, VideoId};

pub mod backend;
mod local;

pub use backend::{BackendError, BackendResult, KvBackend, MemoryBackend};
pub use local::LocalBackend;

// =============================================================================
// Constants
// =============================================================================

/// Key holding the JSON list of video records
pub const VIDEOS_KEY: &str = "videos";

/// Key holding the JSON map of analytics records
pub const ANALYTICS_KEY: &str = "analytics";

/// Key prefix for per-recording blob entries
pub const BLOB_KEY_PREFIX: &str = "blob.";

/// Application directory name under the user data dir
pub const APP_DIR_NAME: &str = "screenreel";

fn blob_key_for(id: &str) -> String {
    format!("{BLOB_KEY_PREFIX}{id}")
}

// =============================================================================
// Usage Summary
// =============================================================================

/// Snapshot of how much of the backing namespace is in use
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    /// Bytes consumed by stored keys and values
    pub used_bytes: u64,
    /// Configured byte quota, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
    /// Number of stored recordings
    pub video_count: usize,
}

// =============================================================================
// Storage Service
// =============================================================================

/// The object store + analytics ledger.
///
/// Construct once and pass by reference to every collaborator; the service
/// exclusively owns the keys it manages.
pub struct StorageService {
    backend: Box<dyn KvBackend>,
    settings: StoreSettings,
}

impl StorageService {
    /// Creates a service over `backend` with default settings.
    pub fn new(backend: Box<dyn KvBackend>) -> Self {
        Self::with_settings(backend, StoreSettings::default())
    }

    /// Creates a service over `backend` with the given settings
    /// (normalized on the way in).
    pub fn with_settings(backend: Box<dyn KvBackend>, mut settings: StoreSettings) -> Self {
        settings.normalize();
        Self { backend, settings }
    }

    /// Opens a file-backed store rooted at `dir`.
    pub fn open(dir: &Path) -> Self {
        Self::new(Box::new(LocalBackend::new(dir.to_path_buf())))
    }

    /// Opens the file-backed store under the user's data directory.
    pub fn open_default() -> CoreResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| CoreError::Internal("no user data directory available".to_string()))?;
        Ok(Self::open(&base.join(APP_DIR_NAME).join("store")))
    }

    /// Returns the active settings.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    // =========================================================================
    // Video CRUD
    // =========================================================================

    /// Stores a new recording: record, payload blob, and a zero-initialized
    /// analytics aggregate, as one logical unit.
    ///
    /// On a backend quota rejection the service evicts the oldest recordings
    /// (see [`StoreSettings::retained_videos`]) and retries exactly once. A
    /// second rejection is [`CoreError::CapacityExceeded`]; every piece
    /// written during the failed attempt is rolled back first, so no orphaned
    /// record, blob, or analytics entry remains.
    pub fn create_video(
        &mut self,
        payload: &[u8],
        meta: NewVideoMetadata,
    ) -> CoreResult<VideoRecord> {
        if self.settings.validate_uploads {
            validate_metadata(&meta)?;
        }

        let record = VideoRecord::new(
            meta,
            &self.settings.share_base_url,
            &self.settings.default_mime_type,
        );
        let blob_value = encode_data_url(&record.mime_type, payload);

        match self.try_persist_new(&record, &blob_value) {
            Ok(()) => {
                info!(
                    "Stored recording {} ('{}', {} bytes)",
                    record.id,
                    record.title,
                    payload.len()
                );
                Ok(record)
            }
            Err(CoreError::Backend(BackendError::QuotaExceeded { .. })) => {
                warn!(
                    "Capacity pressure storing '{}'; evicting oldest recordings",
                    record.title
                );
                self.evict_for_incoming()?;

                match self.try_persist_new(&record, &blob_value) {
                    Ok(()) => Ok(record),
                    Err(CoreError::Backend(BackendError::QuotaExceeded { .. })) => {
                        Err(CoreError::CapacityExceeded(format!(
                            "recording '{}' ({} bytes) does not fit even after eviction; \
                             delete recordings manually",
                            record.filename,
                            payload.len()
                        )))
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Returns all stored records in insertion order.
    pub fn list_videos(&self) -> CoreResult<Vec<VideoRecord>> {
        self.load_videos()
    }

    /// Looks up one record. Pure read; absent ids are `Ok(None)`.
    pub fn get_video(&self, id: &str) -> CoreResult<Option<VideoRecord>> {
        Ok(self.load_videos()?.into_iter().find(|v| v.id == id))
    }

    /// Returns the raw payload for a recording. Pure read.
    pub fn get_blob(&self, id: &str) -> CoreResult<Option<Vec<u8>>> {
        match self.backend.get(&blob_key_for(id))? {
            Some(value) => decode_data_url(&value).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes a recording's record, blob, and analytics together.
    /// Deleting an unknown id is a no-op.
    pub fn delete_video(&mut self, id: &str) -> CoreResult<()> {
        let mut videos = self.load_videos()?;
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            debug!("Delete of unknown recording {} ignored", id);
            return Ok(());
        }

        // Blob first: freed bytes guarantee the shrinking list writes fit.
        self.backend.remove(&blob_key_for(id))?;
        self.store_videos(&videos)?;

        let mut analytics = self.load_analytics_map()?;
        if analytics.remove(id).is_some() {
            self.store_analytics_map(&analytics)?;
        }

        info!("Deleted recording {}", id);
        Ok(())
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Counts one view and stamps `lastViewed`. Silent no-op for an unknown
    /// id. No deduplication: once-per-session semantics belong to the caller.
    pub fn record_view(&mut self, id: &str) -> CoreResult<()> {
        let mut analytics = self.load_analytics_map()?;
        let Some(entry) = analytics.get_mut(id) else {
            debug!("View for unknown recording {} ignored", id);
            return Ok(());
        };

        entry.record_view();
        self.store_analytics_map(&analytics)
    }

    /// Appends a completion observation and recomputes the average watch
    /// percentage. Silent no-op for an unknown id. Out-of-range values are
    /// stored as given.
    pub fn record_completion(
        &mut self,
        id: &str,
        watch_percentage: f64,
        watch_duration: f64,
    ) -> CoreResult<()> {
        let mut analytics = self.load_analytics_map()?;
        let Some(entry) = analytics.get_mut(id) else {
            debug!("Completion for unknown recording {} ignored", id);
            return Ok(());
        };

        entry.record_completion(watch_percentage, watch_duration);
        self.store_analytics_map(&analytics)
    }

    /// Returns the analytics aggregate for one recording.
    pub fn get_analytics(&self, id: &str) -> CoreResult<Option<AnalyticsRecord>> {
        Ok(self.load_analytics_map()?.remove(id))
    }

    /// Returns every analytics aggregate, keyed by video id.
    pub fn get_all_analytics(&self) -> CoreResult<HashMap<VideoId, AnalyticsRecord>> {
        self.load_analytics_map()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Reports how much of the namespace is in use.
    pub fn usage(&self) -> CoreResult<StorageUsage> {
        Ok(StorageUsage {
            used_bytes: self.backend.usage_bytes()?,
            quota_bytes: self.backend.quota_bytes(),
            video_count: self.load_videos()?.len(),
        })
    }

    /// Removes every key the service owns, including stray blob entries whose
    /// record is already gone. Returns the number of recordings removed.
    pub fn clear_all(&mut self) -> CoreResult<usize> {
        let videos = self.load_videos()?;
        let count = videos.len();

        for video in &videos {
            self.backend.remove(&blob_key_for(&video.id))?;
        }
        self.backend.remove(VIDEOS_KEY)?;
        self.backend.remove(ANALYTICS_KEY)?;

        for key in self.backend.keys()? {
            if key.starts_with(BLOB_KEY_PREFIX) {
                self.backend.remove(&key)?;
            }
        }

        info!("Cleared store ({} recordings removed)", count);
        Ok(count)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load_videos(&self) -> CoreResult<Vec<VideoRecord>> {
        match self.backend.get(VIDEOS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| CoreError::Corrupted(format!("video list failed to parse: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn store_videos(&mut self, videos: &[VideoRecord]) -> CoreResult<()> {
        let raw = serde_json::to_string(videos)?;
        self.backend.set(VIDEOS_KEY, &raw)?;
        Ok(())
    }

    fn load_analytics_map(&self) -> CoreResult<HashMap<VideoId, AnalyticsRecord>> {
        match self.backend.get(ANALYTICS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| CoreError::Corrupted(format!("analytics map failed to parse: {e}"))),
            None => Ok(HashMap::new()),
        }
    }

    fn store_analytics_map(&mut self, map: &HashMap<VideoId, AnalyticsRecord>) -> CoreResult<()> {
        let raw = serde_json::to_string(map)?;
        self.backend.set(ANALYTICS_KEY, &raw)?;
        Ok(())
    }

    /// One write attempt for a new recording. Either all three entries land
    /// or none do: a quota rejection partway through undoes the earlier puts
    /// of this attempt before returning.
    fn try_persist_new(&mut self, record: &VideoRecord, blob_value: &str) -> CoreResult<()> {
        let prev_videos = self.backend.get(VIDEOS_KEY)?;

        let mut videos = self.load_videos()?;
        videos.push(record.clone());
        let videos_raw = serde_json::to_string(&videos)?;

        let mut analytics = self.load_analytics_map()?;
        analytics.insert(record.id.clone(), AnalyticsRecord::new(&record.id));
        let analytics_raw = serde_json::to_string(&analytics)?;

        let blob_key = blob_key_for(&record.id);

        // Largest write first: if the payload doesn't fit, nothing else has
        // been touched yet.
        self.backend.set(&blob_key, blob_value)?;

        if let Err(e) = self.backend.set(VIDEOS_KEY, &videos_raw) {
            self.restore_entry(&blob_key, None);
            return Err(e.into());
        }

        if let Err(e) = self.backend.set(ANALYTICS_KEY, &analytics_raw) {
            self.restore_entry(&blob_key, None);
            self.restore_entry(VIDEOS_KEY, prev_videos);
            return Err(e.into());
        }

        Ok(())
    }

    /// Best-effort rollback of one entry to its pre-attempt value. Restoring
    /// always shrinks or removes, so it cannot itself hit the quota; a
    /// failure here still gets logged rather than masking the original error.
    fn restore_entry(&mut self, key: &str, prev: Option<String>) {
        let result = match prev {
            Some(value) => self.backend.set(key, &value),
            None => self.backend.remove(key),
        };
        if let Err(e) = result {
            warn!("Failed to restore '{}' after aborted write: {}", key, e);
        }
    }

    /// Evicts oldest-`createdAt`-first so that, counting the incoming
    /// recording, at most `retained_videos` remain. Each evicted recording
    /// loses its blob, analytics, and metadata together. Returns how many
    /// recordings were evicted.
    fn evict_for_incoming(&mut self) -> CoreResult<usize> {
        let mut videos = self.load_videos()?;
        let keep = self.settings.retained_videos.saturating_sub(1);
        if videos.len() <= keep {
            return Ok(0);
        }

        let mut by_age = videos.clone();
        by_age.sort_by(|a, b| b.created_at_utc().cmp(&a.created_at_utc()));

        let keep_ids: Vec<VideoId> = by_age.iter().take(keep).map(|v| v.id.clone()).collect();
        let evicted: Vec<VideoRecord> = videos
            .iter()
            .filter(|v| !keep_ids.contains(&v.id))
            .cloned()
            .collect();
        videos.retain(|v| keep_ids.contains(&v.id));

        let mut analytics = self.load_analytics_map()?;
        for video in &evicted {
            analytics.remove(&video.id);
        }

        // Blobs first: deleting them frees the headroom the retry needs.
        for video in &evicted {
            self.backend.remove(&blob_key_for(&video.id))?;
        }
        self.store_videos(&videos)?;
        self.store_analytics_map(&analytics)?;

        for video in &evicted {
            info!("Evicted recording {} ('{}')", video.id, video.title);
        }
        Ok(evicted.len())
    }
}

fn validate_metadata(meta: &NewVideoMetadata) -> CoreResult<()> {
    if !meta.duration.is_finite() || meta.duration < 0.0 {
        return Err(CoreError::InvalidPayload(format!(
            "duration must be a non-negative number of seconds, got {}",
            meta.duration
        )));
    }
    if meta.filename.trim().is_empty() {
        return Err(CoreError::InvalidPayload("filename is empty".to_string()));
    }
    Ok(())
}

// =============================================================================
// Blob Encoding
// =============================================================================

fn encode_data_url(mime_type: &str, payload: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(payload))
}

fn decode_data_url(value: &str) -> CoreResult<Vec<u8>> {
    let encoded = value
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .ok_or_else(|| CoreError::Corrupted("stored blob is not a base64 data URL".to_string()))?;

    BASE64
        .decode(encoded)
        .map_err(|e| CoreError::Corrupted(format!("stored blob failed to decode: {e}")))
}

// =============================================================================
// Tests
// =============================================================================
