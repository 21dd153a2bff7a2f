//! Summary record returned alongside an encoded render.

use serde::{Deserialize, Serialize};

/// Metadata describing a finished render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    /// Number of items rendered.
    pub item_count: usize,

    /// Sum over items of hold duration plus transition pad, in seconds.
    pub total_duration_seconds: f64,

    /// Size of the assembled container in bytes.
    pub size_bytes: u64,

    /// Frames delivered to the recorder.
    #[serde(default)]
    pub frame_count: u64,

    /// Encoded chunks assembled into the container.
    #[serde(default)]
    pub chunk_count: usize,

    /// MIME type of the container (e.g. `video/webm;codecs=vp9`).
    #[serde(default)]
    pub mime_type: String,

    /// Completion timestamp (RFC 3339).
    #[serde(default)]
    pub rendered_at: String,
}

impl RenderMetadata {
    /// Stamp the metadata with the current wall-clock time.
    pub fn stamped(mut self) -> Self {
        self.rendered_at = chrono::Utc::now().to_rfc3339();
        self
    }

    /// Serialize as pretty JSON for hosts that persist it next to the video.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_uses_camel_case_keys() {
        let meta = RenderMetadata {
            item_count: 2,
            total_duration_seconds: 10.0,
            size_bytes: 4096,
            frame_count: 300,
            chunk_count: 3,
            mime_type: "video/webm;codecs=vp9".to_string(),
            rendered_at: String::new(),
        };

        let value: serde_json::Value = serde_json::from_str(&meta.to_json().unwrap()).unwrap();
        assert_eq!(value["itemCount"], 2);
        assert_eq!(value["totalDurationSeconds"], 10.0);
        assert_eq!(value["sizeBytes"], 4096);
    }

    #[test]
    fn test_minimal_record_deserializes() {
        let meta: RenderMetadata = serde_json::from_str(
            r#"{"itemCount":1,"totalDurationSeconds":3.0,"sizeBytes":10}"#,
        )
        .unwrap();
        assert_eq!(meta.item_count, 1);
        assert_eq!(meta.frame_count, 0);
        assert!(meta.mime_type.is_empty());
    }

    #[test]
    fn test_stamped_sets_timestamp() {
        let meta = RenderMetadata {
            item_count: 0,
            total_duration_seconds: 0.0,
            size_bytes: 0,
            frame_count: 0,
            chunk_count: 0,
            mime_type: String::new(),
            rendered_at: String::new(),
        }
        .stamped();
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.rendered_at).is_ok());
    }
}
