//! Store Settings
//!
//! Configuration for the storage service with schema defaults and tolerant
//! normalization: bad values are corrected instead of failing, so an old or
//! hand-edited config doesn't brick the store.

use serde::{Deserialize, Serialize};

/// Default number of recordings retained once capacity pressure hits
pub const DEFAULT_RETAINED_VIDEOS: usize = 3;

/// Default share-link origin (the dev-server origin the demo runs on)
pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:1420";

/// Default payload MIME type (what a browser screen recorder emits)
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// Storage service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Maximum recordings retained after an eviction pass, counting the
    /// incoming one
    #[serde(default = "default_retained_videos")]
    pub retained_videos: usize,

    /// Origin used to derive each recording's share URL
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,

    /// MIME type assumed for payloads when the uploader doesn't supply one
    #[serde(default = "default_mime_type")]
    pub default_mime_type: String,

    /// Reject malformed upload metadata instead of storing it as-is.
    /// Off by default: the store is historically permissive and callers
    /// depend on that.
    #[serde(default)]
    pub validate_uploads: bool,
}

fn default_retained_videos() -> usize {
    DEFAULT_RETAINED_VIDEOS
}

fn default_share_base_url() -> String {
    DEFAULT_SHARE_BASE_URL.to_string()
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            retained_videos: default_retained_videos(),
            share_base_url: default_share_base_url(),
            default_mime_type: default_mime_type(),
            validate_uploads: false,
        }
    }
}

impl StoreSettings {
    /// Normalizes and clamps settings so the service always runs with a
    /// usable configuration.
    pub fn normalize(&mut self) {
        if self.retained_videos == 0 {
            self.retained_videos = 1;
        }

        let trimmed = self
            .share_base_url
            .trim()
            .trim_end_matches('/')
            .to_string();
        self.share_base_url = if trimmed.is_empty() {
            default_share_base_url()
        } else {
            trimmed
        };

        // A MIME type without a slash isn't one.
        if !self.default_mime_type.contains('/') {
            self.default_mime_type = default_mime_type();
        }
    }
}
