//! Artifact uploads to object storage with signed-URL generation.
//!
//! Storage is optional end to end: a missing bucket, a failed client
//! build, or any individual upload failure leaves the artifact without a
//! remote URL, and the orchestrator then inlines the local bytes as
//! base64. A run with every upload failing degrades to exactly the same
//! result shape as a run with storage disabled.

use crate::config::StorageConfig;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder, presigning::PresigningConfig, primitives::ByteStream,
    Client,
};
use base64::Engine;
use common::media::SegmentAssets;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub struct ArtifactStore {
    client: Client,
    bucket: String,
    signed_url_ttl: Duration,
    upload_limit: usize,
}

impl ArtifactStore {
    /// Build a client from config. `None` disables uploads (no bucket
    /// configured); static credentials are used when both keys are set,
    /// otherwise the SDK default provider chain takes over.
    pub async fn connect(cfg: &StorageConfig) -> Option<Self> {
        let bucket = cfg.bucket.clone()?;

        let region = Region::new(cfg.region.clone());
        let region_provider = RegionProviderChain::first_try(region.clone()).or_default_provider();
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&base).region(region);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }
        if let (Some(ak), Some(sk)) = (&cfg.access_key, &cfg.secret_key) {
            builder = builder.credentials_provider(Credentials::new(
                ak.clone(),
                sk.clone(),
                None,
                None,
                "static",
            ));
        }

        Some(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            signed_url_ttl: cfg.signed_url_ttl,
            upload_limit: cfg.upload_limit,
        })
    }

    pub async fn ensure_bucket(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await;
    }

    /// Upload one object and mint a time-limited signed GET URL for it.
    /// Failure is per-artifact: logged, `None` returned, siblings
    /// unaffected.
    pub async fn upload_signed(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Option<String> {
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await;
        if let Err(e) = put {
            warn!(key = %key, error = %e, "artifact upload failed");
            return None;
        }

        let presign_cfg = match PresigningConfig::expires_in(self.signed_url_ttl) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "invalid signed URL expiry");
                return None;
            }
        };
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_cfg)
            .await
        {
            Ok(presigned) => Some(presigned.uri().to_string()),
            Err(e) => {
                warn!(key = %key, error = %e, "signed URL generation failed");
                None
            }
        }
    }

    /// Upload every segment's frames and clip concurrently, bounded by
    /// the configured in-flight limit. Results are attached to segments
    /// in (segment, sample) order regardless of completion order.
    pub async fn upload_segment_artifacts(
        &self,
        key_prefix: &str,
        task_id: &str,
        segments: &mut [SegmentAssets],
    ) {
        #[derive(PartialEq, Eq, PartialOrd, Ord)]
        enum Kind {
            Frame,
            Clip,
        }
        struct Job {
            slot: usize,
            kind: Kind,
            sample: usize,
            path: PathBuf,
            key: String,
            content_type: &'static str,
        }

        let mut jobs = Vec::new();
        for (slot, seg) in segments.iter().enumerate() {
            for (sample, path) in seg.frame_paths.iter().enumerate() {
                jobs.push(Job {
                    slot,
                    kind: Kind::Frame,
                    sample,
                    path: path.clone(),
                    key: artifact_key(key_prefix, task_id, "frames", path),
                    content_type: "image/jpeg",
                });
            }
            if let Some(clip) = &seg.clip_path {
                jobs.push(Job {
                    slot,
                    kind: Kind::Clip,
                    sample: 0,
                    path: clip.clone(),
                    key: artifact_key(key_prefix, task_id, "clips", clip),
                    content_type: "video/mp4",
                });
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.upload_limit));
        let uploads = jobs.into_iter().map(|job| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                let bytes = match tokio::fs::read(&job.path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %job.path.display(), error = %e, "artifact unreadable");
                        return None;
                    }
                };
                let url = self.upload_signed(&job.key, bytes, job.content_type).await;
                Some((job, url))
            }
        });

        let mut results: Vec<_> = join_all(uploads).await.into_iter().flatten().collect();
        results.sort_by(|(a, _), (b, _)| {
            (a.slot, &a.kind, a.sample).cmp(&(b.slot, &b.kind, b.sample))
        });

        let mut uploaded = 0usize;
        for (job, url) in results {
            let Some(url) = url else { continue };
            uploaded += 1;
            match job.kind {
                Kind::Frame => segments[job.slot].frame_urls.push(url),
                Kind::Clip => segments[job.slot].clip_url = Some(url),
            }
        }
        info!(uploaded = uploaded, task_id = %task_id, "segment artifacts uploaded");
    }
}

fn artifact_key(prefix: &str, task_id: &str, category: &str, path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}/{}/{}", prefix, task_id, category, filename)
}

/// Inline the frames of every segment that ended up with no remote URLs
/// as base64 data URIs. Not an error path: this is the documented
/// degradation when storage is absent or misbehaving.
pub async fn apply_frame_fallback(segments: &mut [SegmentAssets]) {
    for seg in segments.iter_mut() {
        if !seg.frame_urls.is_empty() || seg.frame_paths.is_empty() {
            continue;
        }
        for path in &seg.frame_paths {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    seg.frame_urls
                        .push(format!("data:image/jpeg;base64,{}", encoded));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "frame unreadable for inlining");
                }
            }
        }
        if !seg.frame_urls.is_empty() {
            info!(
                segment = seg.index,
                frames = seg.frame_urls.len(),
                "storage unavailable, frames inlined as base64"
            );
        }
    }
}

/// Base64 payload for the audio track when it could not be uploaded.
pub async fn audio_fallback_base64(path: &Path) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(&bytes)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "audio unreadable for inlining");
            None
        }
    }
}
