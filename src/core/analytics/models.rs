//! Analytics Model Definitions
//!
//! Engagement aggregates tracked per stored recording. The ledger is
//! deliberately permissive: completion observations are stored exactly as the
//! playback collaborator reports them, with no clamping or range checks, and
//! the running average reflects whatever was stored.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::{TimeSec, VideoId};

/// One observation of how much of a video a viewer watched in one session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionDataPoint {
    /// Observation timestamp (RFC 3339)
    pub timestamp: String,
    /// Maximum watch percentage observed during playback, stored as given
    pub watch_percentage: f64,
    /// Wall-clock watch duration in seconds, stored as given
    pub watch_duration: TimeSec,
}

/// Per-video engagement aggregate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    /// Id of the recording this aggregate belongs to
    pub video_id: VideoId,
    /// Total view count; never decreases
    pub views: u64,
    /// Append-only sequence of completion observations
    pub completion_data: Vec<CompletionDataPoint>,
    /// Arithmetic mean of all completion percentages, recomputed on append
    pub average_watch_percentage: f64,
    /// Timestamp of the most recent view (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed: Option<String>,
}

impl AnalyticsRecord {
    /// Creates a zero-initialized aggregate for a freshly stored recording.
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            views: 0,
            completion_data: Vec::new(),
            average_watch_percentage: 0.0,
            last_viewed: None,
        }
    }

    /// Counts one view. Callers own any once-per-session deduplication.
    pub fn record_view(&mut self) {
        self.views += 1;
        self.last_viewed = Some(Utc::now().to_rfc3339());
    }

    /// Appends a completion observation and recomputes the running average.
    pub fn record_completion(&mut self, watch_percentage: f64, watch_duration: TimeSec) {
        self.completion_data.push(CompletionDataPoint {
            timestamp: Utc::now().to_rfc3339(),
            watch_percentage,
            watch_duration,
        });

        let sum: f64 = self
            .completion_data
            .iter()
            .map(|p| p.watch_percentage)
            .sum();
        self.average_watch_percentage = sum / self.completion_data.len() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Zero Initialization
    // =========================================================================

    #[test]
    fn test_new_is_zero_initialized() {
        let record = AnalyticsRecord::new("01HXYZ");

        assert_eq!(record.video_id, "01HXYZ");
        assert_eq!(record.views, 0);
        assert!(record.completion_data.is_empty());
        assert_eq!(record.average_watch_percentage, 0.0);
        assert!(record.last_viewed.is_none());
    }

    // =========================================================================
    // Views
    // =========================================================================

    #[test]
    fn test_views_increase_by_exactly_one() {
        let mut record = AnalyticsRecord::new("01HXYZ");

        for expected in 1..=5 {
            record.record_view();
            assert_eq!(record.views, expected);
        }
        assert!(record.last_viewed.is_some());
    }

    // =========================================================================
    // Completion Average
    // =========================================================================

    #[test]
    fn test_average_is_arithmetic_mean() {
        let mut record = AnalyticsRecord::new("01HXYZ");

        record.record_completion(80.0, 8.0);
        assert!((record.average_watch_percentage - 80.0).abs() < 1e-9);

        record.record_completion(90.0, 9.0);
        assert!((record.average_watch_percentage - 85.0).abs() < 1e-9);

        record.record_completion(100.0, 10.0);
        assert!((record.average_watch_percentage - 90.0).abs() < 1e-9);
        assert_eq!(record.completion_data.len(), 3);
    }

    #[test]
    fn test_out_of_range_observations_are_stored_as_is() {
        let mut record = AnalyticsRecord::new("01HXYZ");

        record.record_completion(250.0, -5.0);

        let point = &record.completion_data[0];
        assert_eq!(point.watch_percentage, 250.0);
        assert_eq!(point.watch_duration, -5.0);
        assert!((record.average_watch_percentage - 250.0).abs() < 1e-9);
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn test_serialization_is_camel_case() {
        let mut record = AnalyticsRecord::new("01HXYZ");
        record.record_view();
        record.record_completion(50.0, 5.0);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"videoId\":\"01HXYZ\""));
        assert!(json.contains("\"completionData\""));
        assert!(json.contains("\"averageWatchPercentage\""));
        assert!(json.contains("\"lastViewed\""));

        let parsed: AnalyticsRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_last_viewed_is_omitted_until_first_view() {
        let record = AnalyticsRecord::new("01HXYZ");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("lastViewed"));
    }
}
