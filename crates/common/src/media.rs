use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Container/stream metadata probed from a media file.
///
/// Immutable once probed. A run cannot proceed without a positive
/// duration; everything else is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaMetadata {
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Nominal frame rate as reported by the prober (e.g. "30/1" or "29.97").
    pub frame_rate: Option<String>,
    pub size_bytes: Option<u64>,
    pub bit_rate: Option<u64>,
}

impl MediaMetadata {
    /// Render the resolution as "WxH", or "unknown" when the prober could
    /// not determine the video stream dimensions.
    pub fn resolution(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "unknown".to_string(),
        }
    }
}

/// One timestamped span of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptUtterance {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Full speech-recognition output for one audio track.
///
/// A silent recording is represented as an empty transcript with zero
/// utterances, which is distinct from "recognition did not run".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub utterances: Vec<TranscriptUtterance>,
}

impl Transcript {
    pub fn is_silent(&self) -> bool {
        self.text.is_empty() && self.utterances.is_empty()
    }
}

/// Per-segment working state assembled by the pipeline.
///
/// Segments are 1-indexed, ordered, contiguous and non-overlapping over
/// `[0, duration)`. Local paths are scoped to the scratch workspace and
/// die with it; URLs (signed or base64 data URIs) survive in the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAssets {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub frame_paths: Vec<PathBuf>,
    pub frame_urls: Vec<String>,
    pub clip_path: Option<PathBuf>,
    pub clip_url: Option<String>,
    pub is_speech: bool,
    pub speech_text: Option<String>,
}

impl SegmentAssets {
    pub fn new(index: u32, start: f64, end: f64) -> Self {
        Self {
            index,
            start,
            end,
            frame_paths: Vec::new(),
            frame_urls: Vec::new(),
            clip_path: None,
            clip_url: None,
            is_speech: true,
            speech_text: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_rendering() {
        let meta = MediaMetadata {
            duration_secs: 12.0,
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some("30/1".to_string()),
            size_bytes: Some(1024),
            bit_rate: Some(800_000),
        };
        assert_eq!(meta.resolution(), "1920x1080");

        let audio_only = MediaMetadata {
            duration_secs: 12.0,
            width: None,
            height: None,
            frame_rate: None,
            size_bytes: None,
            bit_rate: None,
        };
        assert_eq!(audio_only.resolution(), "unknown");
    }

    #[test]
    fn test_silent_transcript() {
        assert!(Transcript::default().is_silent());

        let spoken = Transcript {
            text: "hello".to_string(),
            utterances: vec![TranscriptUtterance {
                start_secs: 0.0,
                end_secs: 1.0,
                text: "hello".to_string(),
            }],
        };
        assert!(!spoken.is_silent());
    }

    #[test]
    fn test_segment_defaults() {
        let seg = SegmentAssets::new(1, 0.0, 3.0);
        assert!(seg.is_speech);
        assert!(seg.speech_text.is_none());
        assert!(seg.frame_paths.is_empty());
        assert_eq!(seg.duration(), 3.0);
    }
}
