//! Audio track extraction for speech recognition.

use crate::config::FfmpegConfig;
use crate::ffmpeg;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Demux a mono, 16 kHz, MP3-encoded audio track next to the video.
///
/// Non-fatal by contract: silent videos and exotic containers are
/// expected, so a failed extraction returns `None` and the pipeline
/// simply skips speech recognition.
pub async fn extract_audio(cfg: &FfmpegConfig, video: &Path) -> Option<PathBuf> {
    let output = video.with_extension("mp3");
    let args = build_audio_args(video, &output);

    match ffmpeg::run_ok(&cfg.ffmpeg_bin, &args).await {
        Ok(()) => {
            info!(audio = %output.display(), "audio track extracted");
            Some(output)
        }
        Err(e) => {
            warn!(error = %e, "audio extraction failed, continuing without audio");
            None
        }
    }
}

pub fn build_audio_args(video: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-vn".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        "16000".to_string(),
        "-codec:a".to_string(),
        "libmp3lame".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
