//! Fixed-boundary timeline segmentation and transcript assignment.
//!
//! Pure functions of their inputs: for a given duration the segment list
//! is fully deterministic, which the downstream analysis stages rely on.

use common::media::{SegmentAssets, TranscriptUtterance};

/// Fixed early boundaries: short shots at the start of the video, where
/// hook analysis needs the finest granularity.
pub const EARLY_BOUNDARIES: [f64; 5] = [0.0, 3.0, 5.0, 10.0, 20.0];

/// Uniform segment length after the early boundaries.
pub const UNIFORM_SEGMENT_SECS: f64 = 10.0;

/// Partition `[0, duration)` into ordered, contiguous, 1-indexed
/// segments. Candidates shorter than `min_segment_secs` (always the one
/// clipped by `duration`) are dropped, so a run may legally cover
/// slightly less than the full duration but never emits a degenerate
/// extraction window.
pub fn build_segments(duration: f64, min_segment_secs: f64) -> Vec<SegmentAssets> {
    let mut segments = Vec::new();
    let mut index = 1u32;

    for pair in EARLY_BOUNDARIES.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if duration <= start {
            break;
        }
        let actual_end = end.min(duration);
        if actual_end - start < min_segment_secs {
            break;
        }
        segments.push(SegmentAssets::new(index, start, actual_end));
        index += 1;
    }

    let tail_start = EARLY_BOUNDARIES[EARLY_BOUNDARIES.len() - 1];
    if duration > tail_start {
        let mut cursor = tail_start;
        while cursor < duration {
            let candidate_end = duration.min(cursor + UNIFORM_SEGMENT_SECS);
            if candidate_end - cursor < min_segment_secs {
                break;
            }
            segments.push(SegmentAssets::new(index, cursor, candidate_end));
            index += 1;
            cursor = candidate_end;
        }
    }

    segments
}

/// Assign recognized speech to segments by temporal overlap: a segment
/// collects every utterance whose `[start, end)` interval overlaps its
/// own, joined in utterance order with single spaces. Utterances that
/// overlap no segment are dropped. After assignment `is_speech` is
/// authoritative: true iff at least one utterance overlapped.
pub fn assign_transcript(segments: &mut [SegmentAssets], utterances: &[TranscriptUtterance]) {
    for segment in segments.iter_mut() {
        let mut texts: Vec<&str> = Vec::new();
        for utt in utterances {
            let text = utt.text.trim();
            if text.is_empty() {
                continue;
            }
            let overlap_start = segment.start.max(utt.start_secs);
            let overlap_end = segment.end.min(utt.end_secs);
            if overlap_end > overlap_start {
                texts.push(text);
            }
        }
        if texts.is_empty() {
            segment.is_speech = false;
            segment.speech_text = None;
        } else {
            segment.is_speech = true;
            segment.speech_text = Some(texts.join(" "));
        }
    }
}
