//! Metadata probing with an explicit fallback chain.
//!
//! Strategy 1 parses structured ffprobe JSON; strategy 2 (for hosts that
//! ship ffmpeg without ffprobe) runs ffmpeg in info mode and regex-parses
//! its diagnostic stream. The chain is an ordered list so the fallback
//! order is testable on its own; a strategy that cannot run reports
//! `Unavailable` instead of erroring the run.

use crate::config::FfmpegConfig;
use crate::error::PipelineError;
use crate::ffmpeg;
use common::media::MediaMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d+):(\d+)\.(\d+)").expect("valid duration regex")
});
static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Stream.*Video.*?(\d{2,5})x(\d{2,5})").expect("valid resolution regex"));
static FPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s+(?:fps|tbr)").expect("valid fps regex"));

enum ProbeOutcome {
    Applied(MediaMetadata),
    Unavailable,
}

/// Probe the file, trying each strategy in order until one yields a
/// usable (positive) duration. No strategy succeeding is fatal: there is
/// no segmentation without a duration.
pub async fn probe(cfg: &FfmpegConfig, video: &Path) -> Result<MediaMetadata, PipelineError> {
    if let ProbeOutcome::Applied(meta) = probe_with_ffprobe(cfg, video).await {
        if meta.duration_secs > 0.0 {
            return Ok(meta);
        }
    }
    if let ProbeOutcome::Applied(meta) = probe_with_ffmpeg_stderr(cfg, video).await {
        if meta.duration_secs > 0.0 {
            return Ok(meta);
        }
    }
    Err(PipelineError::ProbeFailed)
}

async fn probe_with_ffprobe(cfg: &FfmpegConfig, video: &Path) -> ProbeOutcome {
    let Some(ffprobe_bin) = cfg.ffprobe_bin.as_deref() else {
        return ProbeOutcome::Unavailable;
    };

    let args = build_ffprobe_args(video);
    let output = match ffmpeg::run_capture(ffprobe_bin, &args).await {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "ffprobe invocation failed, falling back");
            return ProbeOutcome::Unavailable;
        }
    };
    if !output.status.success() {
        warn!(
            status = ?output.status,
            stderr = %ffmpeg::stderr_snippet(&output.stderr),
            "ffprobe exited with error, falling back"
        );
        return ProbeOutcome::Unavailable;
    }

    match serde_json::from_slice::<serde_json::Value>(&output.stdout) {
        Ok(json) => ProbeOutcome::Applied(parse_ffprobe_json(&json)),
        Err(e) => {
            warn!(error = %e, "unparseable ffprobe output, falling back");
            ProbeOutcome::Unavailable
        }
    }
}

pub fn build_ffprobe_args(video: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        video.to_string_lossy().to_string(),
    ]
}

fn parse_ffprobe_json(json: &serde_json::Value) -> MediaMetadata {
    let format = json.get("format");

    let duration_secs = format
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size_bytes = format
        .and_then(|f| f.get("size"))
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<u64>().ok());
    let bit_rate = format
        .and_then(|f| f.get("bit_rate"))
        .and_then(|b| b.as_str())
        .and_then(|b| b.parse::<u64>().ok());

    let mut width = None;
    let mut height = None;
    let mut frame_rate = None;
    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            if stream.get("codec_type").and_then(|t| t.as_str()) == Some("video") {
                width = stream.get("width").and_then(|w| w.as_u64()).map(|w| w as u32);
                height = stream
                    .get("height")
                    .and_then(|h| h.as_u64())
                    .map(|h| h as u32);
                frame_rate = stream
                    .get("r_frame_rate")
                    .and_then(|r| r.as_str())
                    .map(|r| r.to_string());
                break;
            }
        }
    }

    MediaMetadata {
        duration_secs,
        width,
        height,
        frame_rate,
        size_bytes,
        bit_rate,
    }
}

/// Fallback for hosts without ffprobe: `ffmpeg -i <file>` with no output
/// file exits non-zero by design, but prints the container metadata on
/// its diagnostic stream. `-v error` must NOT be passed here or the
/// Duration/Stream lines get suppressed.
async fn probe_with_ffmpeg_stderr(cfg: &FfmpegConfig, video: &Path) -> ProbeOutcome {
    let args = vec![
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-hide_banner".to_string(),
    ];
    let output = match ffmpeg::run_capture(&cfg.ffmpeg_bin, &args).await {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "ffmpeg info-mode invocation failed");
            return ProbeOutcome::Unavailable;
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let meta = parse_ffmpeg_stderr(&stderr);
    info!(
        duration_secs = meta.duration_secs,
        resolution = %meta.resolution(),
        fps = meta.frame_rate.as_deref().unwrap_or("unknown"),
        "probed via ffmpeg diagnostics"
    );
    ProbeOutcome::Applied(meta)
}

fn parse_ffmpeg_stderr(stderr: &str) -> MediaMetadata {
    let duration_secs = DURATION_RE
        .captures(stderr)
        .and_then(|caps| {
            let h: f64 = caps.get(1)?.as_str().parse().ok()?;
            let m: f64 = caps.get(2)?.as_str().parse().ok()?;
            let s: f64 = caps.get(3)?.as_str().parse().ok()?;
            let cs: f64 = caps.get(4)?.as_str().parse().ok()?;
            Some(h * 3600.0 + m * 60.0 + s + cs / 100.0)
        })
        .unwrap_or(0.0);

    let (width, height) = RESOLUTION_RE
        .captures(stderr)
        .and_then(|caps| {
            let w: u32 = caps.get(1)?.as_str().parse().ok()?;
            let h: u32 = caps.get(2)?.as_str().parse().ok()?;
            Some((Some(w), Some(h)))
        })
        .unwrap_or((None, None));

    let frame_rate = FPS_RE
        .captures(stderr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    MediaMetadata {
        duration_secs,
        width,
        height,
        frame_rate,
        size_bytes: None,
        bit_rate: None,
    }
}
