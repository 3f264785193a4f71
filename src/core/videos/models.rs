//! Video Record Model Definitions
//!
//! Defines the VideoRecord struct and the metadata the uploader hands over
//! for a new recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{TimeSec, VideoId};

/// Metadata supplied by the uploader for a new recording
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideoMetadata {
    /// Display title
    pub title: String,
    /// Original file name (e.g. "screen-recording.webm")
    pub filename: String,
    /// Measured duration in seconds
    pub duration: TimeSec,
    /// Payload size in bytes as reported by the recorder
    pub size: u64,
    /// Creation timestamp (RFC 3339); stamped with the current time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Payload MIME type; falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A stored screen recording
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Unique identifier (ULID); immutable once created, never reused
    pub id: VideoId,
    /// Display title
    pub title: String,
    /// Original file name
    pub filename: String,
    /// Duration in seconds
    pub duration: TimeSec,
    /// Payload size in bytes
    pub size: u64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Payload MIME type
    #[serde(default = "fallback_mime_type")]
    pub mime_type: String,
    /// Watch-page URL derived from `id`
    pub share_url: String,
}

fn fallback_mime_type() -> String {
    crate::core::settings::DEFAULT_MIME_TYPE.to_string()
}

impl VideoRecord {
    /// Creates a record for a new upload with a generated ULID.
    ///
    /// `created_at` from the metadata is honored when present so imports and
    /// tests can carry their own timestamps; otherwise the record is stamped
    /// with the current time.
    pub fn new(meta: NewVideoMetadata, share_base_url: &str, default_mime_type: &str) -> Self {
        let id = ulid::Ulid::new().to_string();
        let created_at = meta
            .created_at
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let mime_type = meta
            .mime_type
            .unwrap_or_else(|| default_mime_type.to_string());
        let share_url = share_url_for(share_base_url, &id);

        Self {
            id,
            title: meta.title,
            filename: meta.filename,
            duration: meta.duration,
            size: meta.size,
            created_at,
            mime_type,
            share_url,
        }
    }

    /// Parses `created_at`, falling back to the Unix epoch on malformed input
    /// so ordering operations never fail on a single bad record.
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Derives the watch-page URL for a recording id.
pub fn share_url_for(share_base_url: &str, id: &str) -> String {
    format!("{}/watch/{}", share_base_url.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_meta() -> NewVideoMetadata {
        NewVideoMetadata {
            title: "Sprint demo".to_string(),
            filename: "sprint-demo.webm".to_string(),
            duration: 42.5,
            size: 1024,
            created_at: None,
            mime_type: None,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    #[test]
    fn test_new_record_generates_id_and_timestamp() {
        let record = VideoRecord::new(test_meta(), "http://localhost:1420", "video/webm");

        assert_eq!(record.id.len(), 26);
        assert_eq!(record.title, "Sprint demo");
        assert_eq!(record.mime_type, "video/webm");
        assert!(DateTime::parse_from_rfc3339(&record.created_at).is_ok());
    }

    #[test]
    fn test_unique_ids() {
        let a = VideoRecord::new(test_meta(), "http://localhost:1420", "video/webm");
        let b = VideoRecord::new(test_meta(), "http://localhost:1420", "video/webm");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_supplied_timestamp_and_mime_are_kept() {
        let meta = NewVideoMetadata {
            created_at: Some("2024-06-01T12:00:00Z".to_string()),
            mime_type: Some("video/mp4".to_string()),
            ..test_meta()
        };
        let record = VideoRecord::new(meta, "http://localhost:1420", "video/webm");

        assert_eq!(record.created_at, "2024-06-01T12:00:00Z");
        assert_eq!(record.mime_type, "video/mp4");
    }

    // =========================================================================
    // Share URL
    // =========================================================================

    #[test]
    fn test_share_url_derivation() {
        assert_eq!(
            share_url_for("http://localhost:1420", "01ABC"),
            "http://localhost:1420/watch/01ABC"
        );
        // Trailing slash on the base doesn't double up.
        assert_eq!(
            share_url_for("https://reel.example/", "01ABC"),
            "https://reel.example/watch/01ABC"
        );
    }

    #[test]
    fn test_record_share_url_matches_id() {
        let record = VideoRecord::new(test_meta(), "https://reel.example", "video/webm");
        assert_eq!(
            record.share_url,
            format!("https://reel.example/watch/{}", record.id)
        );
    }

    // =========================================================================
    // Timestamps
    // =========================================================================

    #[test]
    fn test_created_at_utc_falls_back_to_epoch() {
        let mut record = VideoRecord::new(test_meta(), "http://localhost:1420", "video/webm");
        record.created_at = "not a timestamp".to_string();
        assert_eq!(record.created_at_utc(), DateTime::<Utc>::UNIX_EPOCH);
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn test_serialization_round_trip() {
        let record = VideoRecord::new(test_meta(), "http://localhost:1420", "video/webm");

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"shareUrl\""));
        assert!(json.contains("\"mimeType\""));

        let parsed: VideoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_deserialization_defaults_missing_mime_type() {
        // Records written before mimeType existed still load.
        let json = r#"{
            "id": "01HXYZ0000000000000000000A",
            "title": "Old clip",
            "filename": "old.webm",
            "duration": 3.0,
            "size": 99,
            "createdAt": "2024-01-01T00:00:00Z",
            "shareUrl": "http://localhost:1420/watch/01HXYZ0000000000000000000A"
        }"#;
        let parsed: VideoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.mime_type, "video/webm");
    }
}
