//! Pipeline orchestration.
//!
//! Sequences source resolution, probing, audio extraction, speech
//! recognition, segmentation, frame/clip extraction and artifact upload,
//! and owns the scratch workspace for the whole run. Only source,
//! probe and segmentation failures abort; every other stage degrades
//! and the run still produces a well-formed result.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::workspace::Workspace;
use crate::{asr, audio, extract, probe, segment, source, storage};
use common::media::Transcript;
use common::result::{round2, BreakdownResult, SegmentView};
use common::task_store::TaskStore;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the full breakdown for one locator.
///
/// The full result (complete base64 payloads) is persisted to the task
/// store under its task id before being returned; callers that need a
/// context-window-sized record should serve [`BreakdownResult::slim`].
/// Cancelling the token aborts outstanding work at the next stage
/// boundary; the scratch workspace is removed on every exit path.
pub async fn run_breakdown(
    locator: &str,
    cfg: &PipelineConfig,
    store: Arc<dyn TaskStore>,
    cancel: CancellationToken,
) -> Result<BreakdownResult, PipelineError> {
    let workspace = Workspace::create(&cfg.temp_root)?;
    let task_id = workspace.task_id().to_string();
    info!(task_id = %task_id, "breakdown started");

    let http = reqwest::Client::new();

    // Source: the only file written into the workspace root.
    let video_path = workspace.video_path();
    source::fetch(locator, &video_path, &cfg.source, &http, &cancel).await?;

    // Metadata is the fatal gate: no duration, no segmentation.
    let metadata = with_cancel(&cancel, probe::probe(&cfg.ffmpeg, &video_path)).await??;
    let duration = metadata.duration_secs;
    info!(
        task_id = %task_id,
        duration_secs = duration,
        resolution = %metadata.resolution(),
        "metadata probed"
    );

    let mut segments = segment::build_segments(duration, cfg.segmenter.min_segment_secs);
    if segments.is_empty() {
        return Err(PipelineError::NoUsableSegments {
            duration_secs: duration,
        });
    }

    let audio_path = with_cancel(&cancel, audio::extract_audio(&cfg.ffmpeg, &video_path)).await?;

    let artifact_store = storage::ArtifactStore::connect(&cfg.storage).await;
    if artifact_store.is_none() {
        info!(task_id = %task_id, "object storage not configured, artifacts will be inlined");
    }
    if let Some(s) = &artifact_store {
        s.ensure_bucket().await;
    }

    // Speech recognition needs a fetchable URL, so it only runs when the
    // audio both extracted and uploaded.
    let mut audio_url = None;
    if let (Some(path), Some(s)) = (&audio_path, &artifact_store) {
        if let Ok(bytes) = tokio::fs::read(path).await {
            let key = audio_key(&cfg.storage.key_prefix, &task_id, path);
            audio_url = with_cancel(&cancel, s.upload_signed(&key, bytes, "audio/mpeg")).await?;
        }
    }

    let transcript: Option<Transcript> = match &audio_url {
        Some(url) => with_cancel(&cancel, asr::transcribe(&cfg.asr, &http, url))
            .await?
            .into_transcript(),
        None => None,
    };
    if let Some(t) = &transcript {
        info!(task_id = %task_id, utterances = t.utterances.len(), "transcript ready");
        if !t.utterances.is_empty() {
            segment::assign_transcript(&mut segments, &t.utterances);
        }
    }

    let frames_dir = workspace.frames_dir()?;
    let clips_dir = workspace.clips_dir()?;
    with_cancel(
        &cancel,
        extract::extract_segment_assets(
            &cfg.ffmpeg,
            &video_path,
            &mut segments,
            &frames_dir,
            &clips_dir,
        ),
    )
    .await?;

    if let Some(s) = &artifact_store {
        with_cancel(
            &cancel,
            s.upload_segment_artifacts(&cfg.storage.key_prefix, &task_id, &mut segments),
        )
        .await?;
    }

    // Degradation path: whatever has no remote URL gets inlined.
    storage::apply_frame_fallback(&mut segments).await;
    let mut audio_base64 = None;
    if audio_url.is_none() {
        if let Some(path) = &audio_path {
            audio_base64 = storage::audio_fallback_base64(path).await;
        }
    }

    let full_transcript = transcript
        .as_ref()
        .filter(|t| !t.text.is_empty())
        .map(|t| t.text.clone());

    let result = BreakdownResult {
        task_id: task_id.clone(),
        duration: round2(duration),
        resolution: metadata.resolution(),
        metadata,
        audio_url,
        audio_base64,
        full_transcript,
        segment_count: segments.len(),
        segments: segments.iter().map(SegmentView::from).collect(),
    };

    if let Err(e) = store.save_result(&result).await {
        error!(task_id = %task_id, error = %e, "failed to persist result to task store");
    }

    info!(
        task_id = %task_id,
        segments = result.segment_count,
        "breakdown complete"
    );
    Ok(result)
}

fn audio_key(prefix: &str, task_id: &str, path: &std::path::Path) -> String {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}/audio/{}", prefix, task_id, filename)
}

/// Race a stage against cancellation. The dropped stage future kills any
/// transcoder child processes it spawned; the workspace guard handles
/// file cleanup.
async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_key_layout() {
        let key = audio_key(
            "videobreak",
            "20260101_000000_abcd1234",
            std::path::Path::new("/scratch/20260101_000000_abcd1234.mp3"),
        );
        assert_eq!(
            key,
            "videobreak/20260101_000000_abcd1234/audio/20260101_000000_abcd1234.mp3"
        );
    }

    #[tokio::test]
    async fn test_with_cancel_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let out = with_cancel(&token, async { 42 }).await;
        assert!(matches!(out, Err(PipelineError::Cancelled)));

        let live = CancellationToken::new();
        let out = with_cancel(&live, async { 42 }).await;
        assert!(matches!(out, Ok(42)));
    }
}
