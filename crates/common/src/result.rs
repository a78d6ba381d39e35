use crate::media::{MediaMetadata, SegmentAssets};
use serde::{Deserialize, Serialize};

/// Caller-facing view of one segment. Local scratch paths are dropped;
/// only URLs (signed or inline base64) and transcript fields remain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentView {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub frame_urls: Vec<String>,
    pub clip_url: Option<String>,
    pub is_speech: bool,
    pub speech_text: Option<String>,
}

impl From<&SegmentAssets> for SegmentView {
    fn from(seg: &SegmentAssets) -> Self {
        Self {
            index: seg.index,
            start: round2(seg.start),
            end: round2(seg.end),
            frame_urls: seg.frame_urls.clone(),
            clip_url: seg.clip_url.clone(),
            is_speech: seg.is_speech,
            speech_text: seg.speech_text.clone(),
        }
    }
}

/// The canonical pipeline output record.
///
/// The full form (complete base64 payloads) is persisted in the task store
/// for downstream in-process tools; callers receive the slim form produced
/// by [`BreakdownResult::slim`]. Both forms always carry the same segment
/// count and indices; only payload fields differ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakdownResult {
    pub task_id: String,
    pub duration: f64,
    pub resolution: String,
    pub metadata: MediaMetadata,
    pub audio_url: Option<String>,
    pub audio_base64: Option<String>,
    pub full_transcript: Option<String>,
    pub segment_count: usize,
    pub segments: Vec<SegmentView>,
}

impl BreakdownResult {
    /// Produce the payload-bounded form returned to callers: inline base64
    /// frame URIs collapse into one placeholder noting the cached count,
    /// and an inline audio payload collapses into a short marker. The full
    /// payloads stay retrievable from the task store under `task_id`.
    pub fn slim(&self) -> BreakdownResult {
        let segments = self
            .segments
            .iter()
            .map(|seg| {
                let cached = seg
                    .frame_urls
                    .iter()
                    .filter(|u| u.starts_with("data:"))
                    .count();
                let frame_urls = if cached > 0 {
                    vec![format!(
                        "({} frame(s) cached locally; downstream tools read them from the task store)",
                        cached
                    )]
                } else {
                    seg.frame_urls.clone()
                };
                SegmentView {
                    frame_urls,
                    ..seg.clone()
                }
            })
            .collect();

        BreakdownResult {
            segments,
            audio_base64: self.audio_base64.as_ref().map(|_| {
                "(audio cached as base64; downstream tools read it from the task store)"
                    .to_string()
            }),
            ..self.clone()
        }
    }
}

/// Round to two decimal places for the caller-facing record.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> BreakdownResult {
        BreakdownResult {
            task_id: "20260101_000000_abcd1234".to_string(),
            duration: 12.34,
            resolution: "1280x720".to_string(),
            metadata: MediaMetadata {
                duration_secs: 12.339,
                width: Some(1280),
                height: Some(720),
                frame_rate: Some("30/1".to_string()),
                size_bytes: Some(4096),
                bit_rate: None,
            },
            audio_url: None,
            audio_base64: Some("AAAA".repeat(100)),
            full_transcript: Some("hello world".to_string()),
            segment_count: 2,
            segments: vec![
                SegmentView {
                    index: 1,
                    start: 0.0,
                    end: 3.0,
                    frame_urls: vec![
                        "data:image/jpeg;base64,/9j/AAA=".to_string(),
                        "data:image/jpeg;base64,/9j/BBB=".to_string(),
                    ],
                    clip_url: Some("https://example.com/clip1.mp4".to_string()),
                    is_speech: true,
                    speech_text: Some("hello".to_string()),
                },
                SegmentView {
                    index: 2,
                    start: 3.0,
                    end: 12.34,
                    frame_urls: vec!["https://example.com/frame.jpg".to_string()],
                    clip_url: None,
                    is_speech: false,
                    speech_text: None,
                },
            ],
        }
    }

    #[test]
    fn test_slim_replaces_payloads_only() {
        let full = sample_result();
        let slim = full.slim();

        assert_eq!(slim.segments.len(), full.segments.len());
        for (s, f) in slim.segments.iter().zip(full.segments.iter()) {
            assert_eq!(s.index, f.index);
            assert_eq!(s.start, f.start);
            assert_eq!(s.end, f.end);
            assert_eq!(s.is_speech, f.is_speech);
            assert_eq!(s.speech_text, f.speech_text);
            assert_eq!(s.clip_url, f.clip_url);
        }

        // Base64 frames collapse into one placeholder carrying the count.
        assert_eq!(slim.segments[0].frame_urls.len(), 1);
        assert!(slim.segments[0].frame_urls[0].contains("2 frame(s) cached"));
        // Signed URLs pass through untouched.
        assert_eq!(slim.segments[1].frame_urls, full.segments[1].frame_urls);
        // Audio payload becomes a marker, not None.
        assert!(slim.audio_base64.is_some());
        assert!(!slim
            .audio_base64
            .as_deref()
            .unwrap_or_default()
            .contains("AAAA"));
        assert_eq!(slim.task_id, full.task_id);
        assert_eq!(slim.full_transcript, full.full_transcript);
    }

    #[test]
    fn test_slim_without_payloads_is_identity() {
        let mut full = sample_result();
        full.audio_base64 = None;
        full.segments[0].frame_urls = vec!["https://example.com/a.jpg".to_string()];

        let slim = full.slim();
        assert_eq!(slim, full);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.2345), 1.23);
        assert_eq!(round2(9.876), 9.88);
        assert_eq!(round2(3.0), 3.0);
    }
}
