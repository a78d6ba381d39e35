//! Per-segment keyframe and sub-clip extraction.
//!
//! Every extraction is an independent transcoder invocation with no
//! shared mutable state, so all segments are dispatched concurrently; a
//! semaphore bounds the number of transcoder processes in flight. A
//! failed frame or clip is logged and skipped without touching its
//! siblings.

use crate::config::FfmpegConfig;
use crate::ffmpeg;
use common::media::SegmentAssets;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Keyframe offsets never land closer than this to the segment end; the
/// last sampled frame of a segment can otherwise fall on the first frame
/// of the next shot.
const FRAME_SAFETY_MARGIN_SECS: f64 = 0.1;

/// Evenly spaced sample offsets within `[start, end)`, clamped to stay
/// at least the safety margin before `end`. With the minimum segment
/// length at 0.5s the clamp always leaves offsets inside the segment;
/// the invariant is pinned by tests rather than assumed.
pub fn frame_offsets(start: f64, end: f64, count: u32) -> Vec<f64> {
    let seg_duration = (end - start).max(0.5);
    (0..count)
        .map(|i| {
            let ratio = f64::from(i) / f64::from((count - 1).max(1));
            let raw = start + ratio * seg_duration;
            raw.min(end - FRAME_SAFETY_MARGIN_SECS).max(start)
        })
        .collect()
}

pub fn build_frame_args(video: &Path, offset: f64, quality: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.2}", offset),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        quality.clamp(2, 31).to_string(),
        output.to_string_lossy().to_string(),
    ]
}

pub fn build_clip_args(video: &Path, start: f64, duration: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.2}", start),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{:.2}", duration),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:v".to_string(),
        "1000k".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Extract keyframes and a sub-clip for every segment. Segment order in
/// the slice is the canonical order; completion order does not matter
/// because each task writes only its own segment's fields.
pub async fn extract_segment_assets(
    cfg: &FfmpegConfig,
    video: &Path,
    segments: &mut [SegmentAssets],
    frames_dir: &Path,
    clips_dir: &Path,
) {
    let semaphore = Arc::new(Semaphore::new(cfg.transcode_limit));

    let tasks = segments.iter_mut().map(|segment| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            extract_frames(cfg, video, segment, frames_dir, &semaphore).await;
            extract_clip(cfg, video, segment, clips_dir, &semaphore).await;
        }
    });

    join_all(tasks).await;
}

async fn extract_frames(
    cfg: &FfmpegConfig,
    video: &Path,
    segment: &mut SegmentAssets,
    frames_dir: &Path,
    semaphore: &Semaphore,
) {
    for (i, offset) in frame_offsets(segment.start, segment.end, cfg.frames_per_segment)
        .into_iter()
        .enumerate()
    {
        let output = frames_dir.join(format!("seg{:03}_frame_{}.jpg", segment.index, i));
        let args = build_frame_args(video, offset, cfg.frame_quality, &output);

        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        match ffmpeg::run_ok(&cfg.ffmpeg_bin, &args).await {
            Ok(()) if output.exists() => {
                debug!(segment = segment.index, frame = i, "keyframe extracted");
                segment.frame_paths.push(output);
            }
            Ok(()) => {
                warn!(segment = segment.index, frame = i, "keyframe missing after extraction");
            }
            Err(e) => {
                warn!(segment = segment.index, frame = i, error = %e, "keyframe extraction failed");
            }
        }
    }
}

async fn extract_clip(
    cfg: &FfmpegConfig,
    video: &Path,
    segment: &mut SegmentAssets,
    clips_dir: &Path,
    semaphore: &Semaphore,
) {
    let output = clips_dir.join(format!("seg{:03}_clip.mp4", segment.index));
    let args = build_clip_args(video, segment.start, segment.duration(), &output);

    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return,
    };
    match ffmpeg::run_ok(&cfg.ffmpeg_bin, &args).await {
        Ok(()) => {
            debug!(segment = segment.index, "sub-clip extracted");
            segment.clip_path = Some(output);
        }
        Err(e) => {
            warn!(segment = segment.index, error = %e, "sub-clip extraction failed");
            segment.clip_path = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_offsets_evenly_spaced() {
        let offsets = frame_offsets(10.0, 20.0, 3);
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0], 10.0);
        assert_eq!(offsets[1], 15.0);
        assert!((offsets[2] - 19.9).abs() < 1e-9);
    }

    #[test]
    fn test_frame_offsets_single_frame_at_start() {
        let offsets = frame_offsets(3.0, 5.0, 1);
        assert_eq!(offsets, vec![3.0]);
    }

    #[test]
    fn test_frame_offsets_stay_inside_segment() {
        // Shortest legal segment: the clamp interacts with the sampling
        // ratio but offsets must stay in [start, end).
        for count in 1..=4 {
            for (start, end) in [(0.0, 0.5), (19.5, 20.0), (3.0, 4.2), (0.0, 3.0)] {
                for offset in frame_offsets(start, end, count) {
                    assert!(offset >= start, "offset {} under start {}", offset, start);
                    assert!(offset < end, "offset {} past end {}", offset, end);
                }
            }
        }
    }

    #[test]
    fn test_frame_args_quality_clamped() {
        let args = build_frame_args(Path::new("/v.mp4"), 1.234, 99, Path::new("/f.jpg"));
        let joined = args.join(" ");
        assert!(joined.contains("-ss 1.23"));
        assert!(joined.contains("-q:v 31"));
        assert!(joined.contains("-frames:v 1"));
    }

    #[test]
    fn test_clip_args_reencode_for_range() {
        let args = build_clip_args(Path::new("/v.mp4"), 20.0, 10.0, Path::new("/c.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-ss 20.00"));
        assert!(joined.contains("-t 10.00"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:v 1000k"));
        assert!(joined.contains("-movflags +faststart"));
    }
}
